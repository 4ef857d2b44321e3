pub mod cursor;
pub mod syncer;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::github::{Comment, Thread, MAX_PAGE_SIZE};
use crate::mirror::ReconcileOutcome;
use crate::url::RepoRef;

/// Options controlling a sync pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Items requested per page, for both issues and comments.
    pub page_size: u32,
    /// Ignore the stored cursor and list every thread.
    pub full: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            full: false,
        }
    }
}

/// A repository and the directory it is mirrored into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub repo: RepoRef,
    pub dest: PathBuf,
}

/// Report returned after a sync pass completes.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub repo: String,
    pub started_at: DateTime<Utc>,
    pub since: Option<DateTime<Utc>>,
    pub threads_seen: u64,
    pub threads_updated: u64,
    pub threads_skipped: u64,
    pub comments_new: u64,
    pub comments_overwritten: u64,
    pub comments_unchanged: u64,
}

impl SyncReport {
    pub fn new(repo: &RepoRef, started_at: DateTime<Utc>, since: Option<DateTime<Utc>>) -> Self {
        Self {
            repo: repo.to_string(),
            started_at,
            since,
            threads_seen: 0,
            threads_updated: 0,
            threads_skipped: 0,
            comments_new: 0,
            comments_overwritten: 0,
            comments_unchanged: 0,
        }
    }

    fn record_comment(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::New(_) => self.comments_new += 1,
            ReconcileOutcome::Overwritten(_) => self.comments_overwritten += 1,
            ReconcileOutcome::Unchanged(_) => self.comments_unchanged += 1,
        }
    }
}

/// Callbacks for user-visible progress. All methods default to no-ops.
pub trait SyncProgress: Send + Sync {
    fn on_repo_start(&self, _repo: &RepoRef, _since: Option<DateTime<Utc>>) {}
    fn on_thread_found(&self, _thread: &Thread) {}
    fn on_thread_skipped(&self, _thread: &Thread) {}
    fn on_comment(&self, _thread: &Thread, _comment: &Comment, _outcome: ReconcileOutcome) {}
    fn on_thread_updated(&self, _thread: &Thread) {}
    fn on_repo_complete(&self, _report: &SyncReport) {}
}

pub struct NoopProgress;

impl SyncProgress for NoopProgress {}
