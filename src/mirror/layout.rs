//! File and directory naming inside a mirror.

use std::sync::LazyLock;

use regex::Regex;

use crate::github::ThreadKind;

static RE_UNSAFE_TITLE_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());
static RE_COMMENT_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)_(.*)\.txt$").unwrap());

/// Name of the record file at the repository root and in each thread directory.
pub const INFO_FILE: &str = "info.txt";

/// Sanitized titles are cut to this many characters so directory names stay
/// well under common filesystem limits.
pub const MAX_TITLE_LEN: usize = 120;

/// Replace everything except ASCII letters, digits, `-` and `_` with `_`.
pub fn sanitize_title(title: &str) -> String {
    let sanitized = RE_UNSAFE_TITLE_CHAR.replace_all(title, "_");
    sanitized.chars().take(MAX_TITLE_LEN).collect()
}

/// `issue_7_` / `pr_12_`: shared by every name this thread's directory has had.
pub fn thread_dir_prefix(kind: ThreadKind, number: u64) -> String {
    format!("{}_{}_", kind.dir_prefix(), number)
}

/// Canonical directory name for a thread, e.g. `issue_7_Fix_bug`.
pub fn thread_dir_name(kind: ThreadKind, number: u64, title: &str) -> String {
    format!("{}{}", thread_dir_prefix(kind, number), sanitize_title(title))
}

pub fn comment_file_name(number: u32, author: &str) -> String {
    format!("{number:04}_{author}.txt")
}

/// Split `0003_alice.txt` into `(3, "alice")`.
pub fn parse_comment_file_name(name: &str) -> Option<(u32, &str)> {
    let caps = RE_COMMENT_FILE.captures(name)?;
    let number = caps.get(1)?.as_str().parse().ok()?;
    Some((number, caps.get(2)?.as_str()))
}

/// Whether a directory name belongs to some thread of the mirror.
pub fn is_thread_dir_name(name: &str) -> Option<ThreadKind> {
    let (prefix, rest) = name.split_once('_')?;
    let kind = match prefix {
        "issue" => ThreadKind::Issue,
        "pr" => ThreadKind::PullRequest,
        _ => return None,
    };
    let (number, _) = rest.split_once('_')?;
    (!number.is_empty() && number.chars().all(|c| c.is_ascii_digit())).then_some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Fix bug"), "Fix_bug");
        assert_eq!(sanitize_title("a-b_c/d.e"), "a-b_c_d_e");
        assert_eq!(sanitize_title("Ünïcode: ok?"), "_n_code__ok_");
        assert_eq!(sanitize_title(""), "");
    }

    #[test]
    fn test_sanitize_title_truncates() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_title(&long).len(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_thread_dir_name() {
        assert_eq!(thread_dir_name(ThreadKind::Issue, 7, "Fix bug"), "issue_7_Fix_bug");
        assert_eq!(
            thread_dir_name(ThreadKind::PullRequest, 12, "Add CI"),
            "pr_12_Add_CI"
        );
    }

    #[test]
    fn test_comment_file_names() {
        assert_eq!(comment_file_name(1, "alice"), "0001_alice.txt");
        assert_eq!(comment_file_name(12345, "bob"), "12345_bob.txt");
        assert_eq!(parse_comment_file_name("0001_alice.txt"), Some((1, "alice")));
        assert_eq!(
            parse_comment_file_name("0002_dependabot[bot].txt"),
            Some((2, "dependabot[bot]"))
        );
        assert_eq!(parse_comment_file_name("0003_my_name.txt"), Some((3, "my_name")));
        assert_eq!(parse_comment_file_name("info.txt"), None);
        assert_eq!(parse_comment_file_name("0001_alice.md"), None);
    }

    #[test]
    fn test_is_thread_dir_name() {
        assert_eq!(is_thread_dir_name("issue_7_Fix_bug"), Some(ThreadKind::Issue));
        assert_eq!(is_thread_dir_name("pr_12_"), Some(ThreadKind::PullRequest));
        assert_eq!(is_thread_dir_name("issue_x_y"), None);
        assert_eq!(is_thread_dir_name("notes"), None);
    }
}
