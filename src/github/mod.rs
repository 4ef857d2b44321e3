pub mod client;
pub mod model;
pub mod pagination;
pub mod rate_limit;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::date_util::format_since;
use crate::error::Result;

pub use client::{ClientOptions, GithubClient};
pub use model::{Comment, CommentSequence, Thread, ThreadKind};
pub use pagination::Paginator;

/// Largest page size the GitHub REST API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters for one page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// `state` filter, only sent for the issue listing (`all` = open and closed).
    pub state: Option<&'static str>,
    pub page: u32,
    pub per_page: u32,
    pub since: Option<DateTime<Utc>>,
}

impl PageQuery {
    pub fn first(per_page: u32, since: Option<DateTime<Utc>>) -> Self {
        Self {
            state: None,
            page: 1,
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
            since,
        }
    }

    /// Query string pairs in the order they are sent.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(state) = self.state {
            pairs.push(("state", state.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("per_page", self.per_page.to_string()));
        if let Some(since) = self.since {
            pairs.push(("since", format_since(since)));
        }
        pairs
    }
}

/// The network capability the sync engine consumes: fetch one page of raw
/// JSON records from a paginated collection endpoint.
///
/// Implementations report transport failures and non-success statuses as
/// errors; they never filter the returned records themselves.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, endpoint: &str, query: &PageQuery) -> Result<Vec<Value>>;
}
