//! Typed error taxonomy for the publish pipeline.
//!
//! Every step of a publish maps its failure into exactly one
//! `PublishError` variant; the first failure aborts the remaining steps
//! and is returned unchanged to the caller layer, which maps variants to
//! HTTP status codes. Nothing here is retried internally.

use thiserror::Error;

/// Failures a single publish invocation can surface.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The configured token is missing required scope, or GitHub rejected
    /// authentication. Transport detail is deliberately collapsed away:
    /// scope/token problems are the only actionable class at this boundary.
    #[error("Invalid GitHub token or insufficient permissions")]
    Unauthorized,

    /// The target reference did not decompose into a non-empty owner and
    /// repository name.
    #[error("Invalid repository reference: {reference}")]
    InvalidReference { reference: String },

    /// GitHub answered the request with an error status (other than the
    /// 404-on-lookup the ensure-exists step handles itself).
    #[error("GitHub API error{}: {message}", fmt_status(.status))]
    RemoteFailure { status: Option<u16>, message: String },

    /// The request never produced a remote answer: connect failure,
    /// timeout, DNS. Distinguished from `RemoteFailure` so the caller can
    /// decide to retry the whole publish.
    #[error("Failed to reach GitHub: {0}")]
    TransportFailure(#[source] reqwest::Error),

    /// A local step failed: workspace creation, file write, or a git
    /// operation in the staging repository.
    #[error("Local git operation failed: {message}")]
    LocalOperation {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" (status {s})"),
        None => String::new(),
    }
}

impl PublishError {
    /// Build a `LocalOperation` without an underlying source error.
    pub fn local(message: impl Into<String>) -> Self {
        Self::LocalOperation {
            message: message.into(),
            source: None,
        }
    }

    /// The origin HTTP status, when the remote supplied one.
    pub fn origin_status(&self) -> Option<u16> {
        match self {
            Self::RemoteFailure { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<git2::Error> for PublishError {
    fn from(err: git2::Error) -> Self {
        Self::LocalOperation {
            message: err.message().to_string(),
            source: Some(err.into()),
        }
    }
}

impl From<std::io::Error> for PublishError {
    fn from(err: std::io::Error) -> Self {
        Self::LocalOperation {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

/// Classify a `reqwest` failure: an error status that made it back from
/// GitHub is a `RemoteFailure`; anything that never got an answer is a
/// `TransportFailure`.
impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::RemoteFailure {
                status: Some(status.as_u16()),
                message: err.to_string(),
            },
            None => Self::TransportFailure(err),
        }
    }
}
