use std::fmt;

use crate::error::{Error, Result};

/// An `owner/name` pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Browser URL of the repository, as recorded in the mirror root.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    /// Collection endpoint listing the repository's issues and pull requests.
    pub fn issues_endpoint(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            api_base.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse a GitHub repository URL.
///
/// Supported forms:
/// - `https://github.com/<owner>/<repo>`
/// - `https://github.com/<owner>/<repo>/` and `https://github.com/<owner>/<repo>.git`
/// - `https://github.com/<owner>/<repo>/issues/...` (extra segments are ignored)
pub fn parse_github_url(input: &str) -> Result<RepoRef> {
    let url = url::Url::parse(input).map_err(|e| Error::UrlParse(e.to_string()))?;

    let host = url.host_str().unwrap_or("");
    if host != "github.com" && host != "www.github.com" {
        return Err(Error::UrlParse(format!("not a GitHub URL: {input}")));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [owner, repo, ..] => build_repo_ref(input, owner, repo),
        _ => Err(Error::UrlParse(format!(
            "expected https://github.com/<owner>/<repo>: {input}"
        ))),
    }
}

/// Resolve either an `owner/repo` shorthand or a GitHub URL.
pub fn resolve_repo(input: &str) -> Result<RepoRef> {
    let input = input.trim();
    if input.contains("://") {
        return parse_github_url(input);
    }
    let trimmed = input.trim_end_matches('/');
    match trimmed.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] => build_repo_ref(input, owner, repo),
        _ => Err(Error::InvalidIdentifier(format!(
            "repository must be given as owner/repo or https://github.com/owner/repo: {input}"
        ))),
    }
}

fn build_repo_ref(input: &str, owner: &str, repo: &str) -> Result<RepoRef> {
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if !is_valid_name(owner) || !is_valid_name(repo) {
        return Err(Error::InvalidIdentifier(format!(
            "invalid repository identifier: {input}"
        )));
    }
    Ok(RepoRef::new(owner, repo))
}

/// Check that a string is usable as an owner or repository name.
pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
