//! Target reference normalization.
//!
//! Callers hand us either a bare `owner/repo` slug or a full GitHub URL,
//! possibly with a trailing `.git`. All forms normalize to the same
//! `RepoRef`; anything that does not decompose into a non-empty owner and
//! repo is rejected before any side effect happens.

use std::fmt;

use crate::errors::PublishError;

const GITHUB_HOST_PREFIX: &str = "https://github.com/";
const HOST_MARKER: &str = "github.com/";

/// A normalized `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Normalize a caller-supplied target reference.
    ///
    /// Steps: trim, strip a trailing `.git`, prepend the canonical host
    /// prefix unless already a full GitHub URL, then split after the
    /// host marker and on `/`.
    pub fn parse(reference: &str) -> Result<Self, PublishError> {
        let invalid = || PublishError::InvalidReference {
            reference: reference.to_string(),
        };

        let cleaned = reference.trim();
        let cleaned = cleaned.strip_suffix(".git").unwrap_or(cleaned);
        let url = if cleaned.starts_with(GITHUB_HOST_PREFIX) {
            cleaned.to_string()
        } else {
            format!("{GITHUB_HOST_PREFIX}{cleaned}")
        };

        let path = url.split(HOST_MARKER).nth(1).ok_or_else(invalid)?;
        let mut segments = path.split('/');
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();

        if owner.is_empty() || repo.is_empty() || segments.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Public browse URL for the repository.
    pub fn html_url(&self) -> String {
        format!("{GITHUB_HOST_PREFIX}{}/{}", self.owner, self.repo)
    }

    /// Push URL with the credential embedded, suitable for registering as
    /// the workspace's remote. Never log this value.
    pub fn authenticated_remote(&self, token: &str) -> String {
        format!("https://{token}@github.com/{}/{}.git", self.owner, self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
