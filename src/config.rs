//! The optional `~/.ghmirror/config.toml` file.
//!
//! ```toml
//! token = "ghp_..."          # optional
//! page_size = 100
//! jobs = 2
//!
//! [[repos]]
//! repo = "Akuli/porcupine"
//! dest = "/srv/backups/porcupine"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::sync::RepoTarget;
use crate::url::resolve_repo;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub page_size: Option<u32>,
    /// Repositories synced concurrently by `ghmirror all`.
    pub jobs: Option<usize>,
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoEntry {
    /// `owner/repo` or a GitHub URL.
    pub repo: String,
    pub dest: PathBuf,
}

impl Config {
    /// `~/.ghmirror/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".ghmirror")
            .join("config.toml"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load an explicitly named file, or the default file if it exists.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = Self::default_path()?;
        if path.is_file() {
            log::debug!("Loading config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// The `[[repos]]` entries as sync targets.
    pub fn targets(&self) -> Result<Vec<RepoTarget>> {
        self.repos
            .iter()
            .map(|entry| {
                Ok(RepoTarget {
                    repo: resolve_repo(&entry.repo)?,
                    dest: entry.dest.clone(),
                })
            })
            .collect()
    }
}
