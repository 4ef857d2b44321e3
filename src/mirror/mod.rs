pub mod layout;
pub mod reconcile;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::date_util::{format_timestamp, parse_timestamp};
use crate::error::{Error, Result};
use crate::github::{Comment, ThreadKind};

use layout::{
    is_thread_dir_name, parse_comment_file_name, thread_dir_name, thread_dir_prefix, INFO_FILE,
};
pub use reconcile::ReconcileOutcome;

/// Contents of the `info.txt` record at the root of a mirrored repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoRecord {
    pub github_url: Option<String>,
    /// Start of the last fully completed sync pass.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Counts reported by `MirrorStore::summary`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub issues: usize,
    pub pull_requests: usize,
    pub comments: usize,
    /// Thread directories without a metadata record (interrupted syncs).
    pub incomplete: usize,
}

/// Sole owner of the on-disk mirror of one repository.
///
/// Layout:
/// ```text
/// <root>/info.txt                      GithubURL + LastUpdated
/// <root>/issue_7_Fix_bug/info.txt      Title + Updated
/// <root>/issue_7_Fix_bug/0001_alice.txt
/// ```
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
}

impl MirrorStore {
    /// Open (creating if needed) the mirror rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::fs(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the repository record. A missing file yields an empty record;
    /// unparsable lines are ignored with a warning so the caller falls back
    /// to a full resync.
    pub fn read_repo_record(&self) -> Result<RepoRecord> {
        let path = self.root.join(INFO_FILE);
        let Some(text) = read_optional(&path)? else {
            return Ok(RepoRecord::default());
        };

        let mut record = RepoRecord::default();
        for line in text.lines() {
            if let Some(url) = line.strip_prefix("GithubURL: ") {
                record.github_url = Some(url.trim().to_string());
            } else if let Some(value) = line.strip_prefix("LastUpdated: ") {
                record.last_updated = parse_timestamp(value);
                if record.last_updated.is_none() {
                    log::warn!(
                        "Ignoring unreadable LastUpdated {:?} in {}",
                        value,
                        path.display()
                    );
                }
            }
        }
        Ok(record)
    }

    pub fn write_repo_record(&self, record: &RepoRecord) -> Result<()> {
        let mut text = String::new();
        if let Some(url) = &record.github_url {
            text.push_str(&format!("GithubURL: {url}\n"));
        }
        if let Some(ts) = record.last_updated {
            text.push_str(&format!("LastUpdated: {}\n", format_timestamp(ts)));
        }
        write_atomic(&self.root.join(INFO_FILE), &text)
    }

    /// Directory for a thread, created if missing.
    ///
    /// When a directory for the same kind and number exists under an older
    /// title, it is renamed to the current name so its comment files and
    /// their numbers carry over.
    pub fn resolve_thread_dir(
        &self,
        kind: ThreadKind,
        number: u64,
        title: &str,
    ) -> Result<PathBuf> {
        let name = thread_dir_name(kind, number, title);
        let target = self.root.join(&name);
        let prefix = thread_dir_prefix(kind, number);

        if !target.exists() {
            let entries = fs::read_dir(&self.root).map_err(|e| Error::fs(&self.root, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| Error::fs(&self.root, e))?;
                let existing = entry.file_name();
                let Some(existing) = existing.to_str() else {
                    continue;
                };
                if existing.starts_with(&prefix) && existing != name && entry.path().is_dir() {
                    log::info!("Title changed, renaming {existing} to {name}");
                    fs::rename(entry.path(), &target).map_err(|e| Error::fs(entry.path(), e))?;
                    break;
                }
            }
        }

        fs::create_dir_all(&target).map_err(|e| Error::fs(&target, e))?;
        Ok(target)
    }

    /// `updated_at` recorded by the last completed sync of a thread.
    pub fn last_synced_updated_at(&self, thread_dir: &Path) -> Result<Option<DateTime<Utc>>> {
        let path = thread_dir.join(INFO_FILE);
        let Some(text) = read_optional(&path)? else {
            return Ok(None);
        };
        let updated = text
            .lines()
            .find_map(|line| line.strip_prefix("Updated: "))
            .and_then(parse_timestamp);
        if updated.is_none() {
            log::warn!("No usable Updated line in {}, resyncing thread", path.display());
        }
        Ok(updated)
    }

    /// Replace the thread's metadata record. Call only after every comment of
    /// the thread has been reconciled: until then the old record keeps the
    /// thread marked stale.
    pub fn write_metadata(
        &self,
        thread_dir: &Path,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let title = title.replace(['\r', '\n'], " ");
        let text = format!("Title: {title}\nUpdated: {}\n", format_timestamp(updated_at));
        write_atomic(&thread_dir.join(INFO_FILE), &text)
    }

    pub fn reconcile(&self, thread_dir: &Path, comment: &Comment) -> Result<ReconcileOutcome> {
        reconcile::reconcile(thread_dir, comment)
    }

    pub fn summary(&self) -> Result<MirrorSummary> {
        let mut summary = MirrorSummary::default();
        let entries = fs::read_dir(&self.root).map_err(|e| Error::fs(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::fs(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(kind) = entry.file_name().to_str().and_then(is_thread_dir_name) else {
                continue;
            };
            match kind {
                ThreadKind::Issue => summary.issues += 1,
                ThreadKind::PullRequest => summary.pull_requests += 1,
            }
            if !path.join(INFO_FILE).is_file() {
                summary.incomplete += 1;
            }
            let files = fs::read_dir(&path).map_err(|e| Error::fs(&path, e))?;
            for file in files {
                let file = file.map_err(|e| Error::fs(&path, e))?;
                if file.file_name().to_str().and_then(parse_comment_file_name).is_some() {
                    summary.comments += 1;
                }
            }
        }
        Ok(summary)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            log::warn!("{} is not valid UTF-8, ignoring it", path.display());
            Ok(None)
        }
        Err(e) => Err(Error::fs(path, e)),
    }
}

/// Mode of every file written into a mirror.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Write `contents` to `path` through a temporary file in the same
/// directory, so readers see either the old or the new file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::fs(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| Error::fs(tmp.path(), e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(FILE_MODE))
            .map_err(|e| Error::fs(tmp.path(), e))?;
    }
    tmp.persist(path).map_err(|e| Error::fs(path, e.error))?;
    Ok(())
}
