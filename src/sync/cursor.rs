use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::mirror::layout::INFO_FILE;
use crate::mirror::{MirrorStore, RepoRecord};
use crate::url::RepoRef;

/// Subtracted from the stored cursor in case the local clock and GitHub's
/// clock disagree.
pub const SKEW_MARGIN_MINUTES: i64 = 10;

pub fn skew_margin() -> Duration {
    Duration::minutes(SKEW_MARGIN_MINUTES)
}

/// The per-repository "last completed pass" timestamp.
pub struct ChangeCursor<'a> {
    store: &'a MirrorStore,
}

impl<'a> ChangeCursor<'a> {
    pub fn new(store: &'a MirrorStore) -> Self {
        Self { store }
    }

    /// Start time of the last completed pass, or `None` on the first run or
    /// when the stored record is unreadable.
    pub fn load(&self) -> Result<Option<DateTime<Utc>>> {
        let record = self.store.read_repo_record()?;
        if record.last_updated.is_none() && record.github_url.is_some() {
            log::warn!(
                "No usable LastUpdated in {}, doing a full sync",
                self.store.root().join(INFO_FILE).display()
            );
        }
        Ok(record.last_updated)
    }

    /// The `since` filter for the next pass: the loaded value minus the skew
    /// margin, never the loaded value itself.
    pub fn effective_since(loaded: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        loaded.map(|ts| ts - skew_margin())
    }

    /// Record a completed pass. `started_at` must be the time the pass began.
    pub fn commit(&self, repo: &RepoRef, started_at: DateTime<Utc>) -> Result<()> {
        log::info!("Advancing cursor for {repo} to {started_at}");
        self.store.write_repo_record(&RepoRecord {
            github_url: Some(repo.html_url()),
            last_updated: Some(started_at),
        })
    }
}
