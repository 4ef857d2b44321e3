use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("GitHub request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub request to {endpoint} failed with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Fetch error for {endpoint}: {message}")]
    Fetch { endpoint: String, message: String },

    #[error("Malformed item: {0}")]
    MalformedItem(String),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL: {0}")]
    UrlParse(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised by the transport (the pass must not commit).
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Error::Http { .. } | Error::Status { .. } | Error::Fetch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
