use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for the `since` query parameter (whole seconds, `Z` suffix).
pub fn format_since(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a timestamp for the mirror's text records.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Parse a timestamp read back from a mirror record.
///
/// Accepts RFC 3339 as well as the space-separated form
/// (`2024-05-01 12:30:00.123456+00:00`) that older mirrors recorded.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z")
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
