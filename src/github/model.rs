//! Typed views over raw issue, pull request and comment records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::pagination::Paginator;
use super::PageSource;
use crate::error::{Error, Result};

/// Login GitHub shows for comments whose author account was deleted.
pub const GHOST_USER: &str = "ghost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadKind {
    Issue,
    PullRequest,
}

impl ThreadKind {
    /// Prefix used for the thread's mirror directory.
    pub fn dir_prefix(self) -> &'static str {
        match self {
            ThreadKind::Issue => "issue",
            ThreadKind::PullRequest => "pr",
        }
    }
}

impl fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadKind::Issue => f.write_str("issue"),
            ThreadKind::PullRequest => f.write_str("PR"),
        }
    }
}

/// One post in a thread. The thread's own description is its first comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub remote_id: u64,
    pub author: String,
    /// Edits never change this; edit timestamps are not tracked.
    pub created_at: DateTime<Utc>,
    pub body: String,
}

/// An issue or pull request as listed by the issues endpoint.
#[derive(Debug, Clone)]
pub struct Thread {
    pub number: u64,
    pub kind: ThreadKind,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    /// Comments excluding the initial description.
    pub comment_count: u64,
    pub comments_url: String,
    initial: Comment,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Deserialize)]
struct RawComment {
    id: u64,
    user: Option<RawUser>,
    created_at: DateTime<Utc>,
    body: Option<String>,
}

#[derive(Deserialize)]
struct RawThread {
    id: u64,
    number: u64,
    title: String,
    user: Option<RawUser>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    body: Option<String>,
    comments: u64,
    comments_url: String,
    pull_request: Option<Value>,
}

fn author_login(user: Option<RawUser>) -> String {
    user.map(|u| u.login)
        .unwrap_or_else(|| GHOST_USER.to_string())
}

impl Comment {
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawComment = serde_json::from_value(value)
            .map_err(|e| Error::MalformedItem(format!("comment: {e}")))?;
        Ok(Self {
            remote_id: raw.id,
            author: author_login(raw.user),
            created_at: raw.created_at,
            body: raw.body.unwrap_or_default(),
        })
    }
}

impl Thread {
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawThread = serde_json::from_value(value)
            .map_err(|e| Error::MalformedItem(format!("issue: {e}")))?;
        if raw.number == 0 {
            return Err(Error::MalformedItem("issue number must be positive".into()));
        }
        let kind = if raw.pull_request.is_some() {
            ThreadKind::PullRequest
        } else {
            ThreadKind::Issue
        };
        Ok(Self {
            number: raw.number,
            kind,
            title: raw.title,
            updated_at: raw.updated_at,
            comment_count: raw.comments,
            comments_url: raw.comments_url,
            initial: Comment {
                remote_id: raw.id,
                author: author_login(raw.user),
                created_at: raw.created_at,
                body: raw.body.unwrap_or_default(),
            },
        })
    }

    /// The thread's own description, treated as comment #1.
    pub fn initial_comment(&self) -> &Comment {
        &self.initial
    }

    /// All comments of the thread: the description first (never filtered by
    /// `since`), then the comment pages filtered by `since`. Comment pages are
    /// not requested at all when the thread has no comments. Each call starts
    /// over from page 1.
    pub fn comments<'a>(
        &self,
        source: &'a dyn PageSource,
        since: Option<DateTime<Utc>>,
        per_page: u32,
    ) -> CommentSequence<'a> {
        let pages = (self.comment_count != 0)
            .then(|| Paginator::new(source, self.comments_url.clone(), per_page, since));
        CommentSequence {
            initial: Some(self.initial.clone()),
            pages,
        }
    }
}

impl fmt::Display for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: {}", self.kind, self.number, self.title)
    }
}

/// Lazy sequence of a thread's comments.
pub struct CommentSequence<'a> {
    initial: Option<Comment>,
    pages: Option<Paginator<'a>>,
}

impl CommentSequence<'_> {
    pub async fn next_comment(&mut self) -> Result<Option<Comment>> {
        if let Some(initial) = self.initial.take() {
            return Ok(Some(initial));
        }
        let Some(pages) = self.pages.as_mut() else {
            return Ok(None);
        };
        match pages.next_item().await? {
            Some(value) => Comment::from_value(value).map(Some),
            None => Ok(None),
        }
    }
}
