use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::github::{PageSource, Paginator, Thread};
use crate::mirror::MirrorStore;
use crate::sync::cursor::ChangeCursor;
use crate::sync::{SyncOptions, SyncProgress, SyncReport};
use crate::url::RepoRef;

/// What to do with one listed thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadAction {
    /// The mirror already holds this `updated_at`.
    Skip,
    /// Fetch and reconcile comments, then record the new `updated_at`.
    Update,
}

pub fn decide(last_synced: Option<DateTime<Utc>>, thread: &Thread) -> ThreadAction {
    if last_synced == Some(thread.updated_at) {
        ThreadAction::Skip
    } else {
        ThreadAction::Update
    }
}

/// Run one sync pass of `repo` into `store`.
///
/// Threads updated since the stored cursor (minus the skew margin) are
/// listed; each one whose recorded `updated_at` differs is brought up to
/// date. The cursor only advances, to the time this pass started, once every
/// listed thread has been handled. Any error returns before that point.
pub async fn sync_repo(
    source: &dyn PageSource,
    api_base: &str,
    repo: &RepoRef,
    store: &MirrorStore,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncReport> {
    let started_at = Utc::now();
    let cursor = ChangeCursor::new(store);
    let loaded = if options.full { None } else { cursor.load()? };
    let since = ChangeCursor::effective_since(loaded);

    match since {
        Some(since) => log::info!(
            "Syncing {repo} into {}, changes since {since}",
            store.root().display()
        ),
        None => log::info!("Syncing {repo} into {} (full)", store.root().display()),
    }
    progress.on_repo_start(repo, since);

    let mut report = SyncReport::new(repo, started_at, since);
    let mut threads =
        Paginator::new(source, repo.issues_endpoint(api_base), options.page_size, since)
            .with_state("all");

    while let Some(item) = threads.next_item().await? {
        let thread = Thread::from_value(item)?;
        report.threads_seen += 1;
        sync_thread(source, store, &thread, since, options, progress, &mut report).await?;
    }

    cursor.commit(repo, started_at)?;
    log::info!(
        "Finished {repo}: {} threads listed, {} updated, {} skipped",
        report.threads_seen,
        report.threads_updated,
        report.threads_skipped
    );
    progress.on_repo_complete(&report);
    Ok(report)
}

async fn sync_thread(
    source: &dyn PageSource,
    store: &MirrorStore,
    thread: &Thread,
    since: Option<DateTime<Utc>>,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
    report: &mut SyncReport,
) -> Result<()> {
    progress.on_thread_found(thread);
    let thread_dir = store.resolve_thread_dir(thread.kind, thread.number, &thread.title)?;
    let last_synced = store.last_synced_updated_at(&thread_dir)?;

    if decide(last_synced, thread) == ThreadAction::Skip {
        log::debug!("{thread} already up to date");
        report.threads_skipped += 1;
        progress.on_thread_skipped(thread);
        return Ok(());
    }

    // A thread that never completed a sync gets all of its comments, not
    // only the ones newer than the repository cursor.
    let comments_since = last_synced.and(since);
    log::debug!("Updating {thread} in {}", thread_dir.display());

    let mut comments = thread.comments(source, comments_since, options.page_size);
    while let Some(comment) = comments.next_comment().await? {
        let outcome = store.reconcile(&thread_dir, &comment)?;
        report.record_comment(outcome);
        progress.on_comment(thread, &comment, outcome);
    }

    store.write_metadata(&thread_dir, &thread.title, thread.updated_at)?;
    report.threads_updated += 1;
    progress.on_thread_updated(thread);
    Ok(())
}
