pub mod config;
pub mod date_util;
pub mod error;
pub mod github;
pub mod mirror;
pub mod sync;
pub mod url;

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt, TryStreamExt};

pub use config::Config;
pub use error::{Error, Result};
pub use github::{ClientOptions, GithubClient, PageQuery, PageSource};
pub use mirror::{MirrorStore, MirrorSummary, ReconcileOutcome, RepoRecord};
pub use sync::{NoopProgress, RepoTarget, SyncOptions, SyncProgress, SyncReport};
pub use url::{parse_github_url, resolve_repo, RepoRef};

use sync::syncer;

/// Main entry point: mirrors repositories through one explicitly
/// constructed page source.
pub struct GhMirror<S: PageSource = GithubClient> {
    source: S,
    api_base: String,
}

impl GhMirror<GithubClient> {
    pub fn new(client: GithubClient) -> Self {
        let api_base = client.api_base().to_string();
        Self {
            source: client,
            api_base,
        }
    }
}

impl<S: PageSource> GhMirror<S> {
    /// Use any page source, e.g. an in-memory one in tests.
    pub fn with_source(source: S, api_base: impl Into<String>) -> Self {
        Self {
            source,
            api_base: api_base.into(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one sync pass of `repo` into `dest`.
    pub async fn sync_repo(
        &self,
        repo: &RepoRef,
        dest: &Path,
        options: &SyncOptions,
        progress: &dyn SyncProgress,
    ) -> Result<SyncReport> {
        let store = MirrorStore::open(dest)?;
        syncer::sync_repo(&self.source, &self.api_base, repo, &store, options, progress).await
    }

    /// Re-sync an existing mirror folder, using the repository URL recorded
    /// in its `info.txt`.
    pub async fn update_folder(
        &self,
        folder: &Path,
        options: &SyncOptions,
        progress: &dyn SyncProgress,
    ) -> Result<SyncReport> {
        if !folder.is_dir() {
            return Err(Error::Config(format!(
                "{} is not a mirror folder",
                folder.display()
            )));
        }
        let store = MirrorStore::open(folder)?;
        let url = store.read_repo_record()?.github_url.ok_or_else(|| {
            Error::Config(format!(
                "{} has no GithubURL line in info.txt",
                folder.display()
            ))
        })?;
        let repo = resolve_repo(&url)?;
        syncer::sync_repo(&self.source, &self.api_base, &repo, &store, options, progress).await
    }

    /// Sync several repositories, up to `jobs` at a time. Each target must
    /// have its own destination, not shared with or nested inside another
    /// target's. Stops at the first failing repository; passes still in
    /// flight are dropped and keep their crash-consistent state.
    pub async fn sync_all(
        &self,
        targets: &[RepoTarget],
        jobs: usize,
        options: &SyncOptions,
        progress: &dyn SyncProgress,
    ) -> Result<Vec<SyncReport>> {
        let stores = disjoint_stores(targets)?;

        stream::iter(targets.iter().zip(stores))
            .map(|(target, store)| async move {
                syncer::sync_repo(
                    &self.source,
                    &self.api_base,
                    &target.repo,
                    &store,
                    options,
                    progress,
                )
                .await
                .inspect_err(|e| log::error!("Failed to sync {}: {e}", target.repo))
            })
            .buffered(jobs.max(1))
            .try_collect()
            .await
    }
}

/// Open the store of every target, rejecting destinations that resolve to
/// the same directory or lie inside one another.
fn disjoint_stores(targets: &[RepoTarget]) -> Result<Vec<MirrorStore>> {
    let mut stores = Vec::with_capacity(targets.len());
    let mut resolved: Vec<(PathBuf, &RepoTarget)> = Vec::with_capacity(targets.len());
    for target in targets {
        let store = MirrorStore::open(&target.dest)?;
        let canonical =
            std::fs::canonicalize(&target.dest).map_err(|e| Error::fs(&target.dest, e))?;
        if let Some((_, other)) = resolved
            .iter()
            .find(|(path, _)| canonical.starts_with(path) || path.starts_with(&canonical))
        {
            return Err(Error::Config(format!(
                "{} ({}) overlaps the destination {} ({})",
                target.dest.display(),
                target.repo,
                other.dest.display(),
                other.repo
            )));
        }
        resolved.push((canonical, target));
        stores.push(store);
    }
    Ok(stores)
}
