//! The publish orchestrator: one call chains reference normalization,
//! scope verification, local staging, remote ensure-exists, and the
//! forced push, with workspace teardown guaranteed on every exit path.

use serde::Serialize;

use crate::errors::PublishError;
use crate::github::{EnsureOutcome, GithubClient};
use crate::publish::reference::RepoRef;
use crate::publish::workspace::Workspace;

/// Fixed commit message. Caller-supplied text never reaches git metadata.
const COMMIT_MESSAGE: &str = "Initial commit from gitship";
const DEFAULT_BRANCH: &str = "main";
const SOURCE_EXTENSION: &str = "js";

/// Caller-supplied input, immutable for the duration of one publish.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Full textual content to publish.
    pub code: String,
    /// Used to derive the committed file's name.
    pub project_name: String,
    /// Bare `owner/repo` slug or full GitHub URL.
    pub target: String,
    /// Defaults to `main` when absent or blank.
    pub branch: Option<String>,
}

/// Success payload returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReceipt {
    pub url: String,
    pub branch: String,
    pub message: String,
}

/// Derive the artifact file name: lowercase the project name, collapse
/// whitespace runs into single hyphens, append the source extension.
pub fn artifact_file_name(project_name: &str) -> String {
    let slug = project_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    format!("{slug}.{SOURCE_EXTENSION}")
}

/// The receipt distinguishes creation from pre-existence: publishing
/// twice to the same target succeeds both times, and the second result
/// says so.
fn receipt_message(outcome: EnsureOutcome) -> &'static str {
    match outcome {
        EnsureOutcome::Created => "Repository created and code pushed to GitHub",
        EnsureOutcome::AlreadyExists => "Repository already exists; code pushed to GitHub",
    }
}

/// Absent or blank branch names fall back to the default branch.
fn resolve_branch(branch: Option<&str>) -> String {
    branch
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BRANCH)
        .to_string()
}

pub struct Publisher {
    github: GithubClient,
    token: String,
    /// Test hook: push somewhere other than github.com.
    #[cfg(test)]
    push_remote_override: Option<String>,
}

impl Publisher {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            github: GithubClient::new(token.clone()),
            token,
            #[cfg(test)]
            push_remote_override: None,
        }
    }

    #[cfg(test)]
    fn with_api_base(token: &str, api_base: &str) -> Self {
        Self {
            github: GithubClient::with_api_base(token, api_base),
            token: token.to_string(),
            push_remote_override: None,
        }
    }

    #[cfg(test)]
    fn with_push_remote(mut self, remote_url: impl Into<String>) -> Self {
        self.push_remote_override = Some(remote_url.into());
        self
    }

    fn remote_url(&self, target: &RepoRef) -> String {
        #[cfg(test)]
        if let Some(url) = &self.push_remote_override {
            return url.clone();
        }
        target.authenticated_remote(&self.token)
    }

    /// Run the full pipeline for one request.
    ///
    /// The first failing step aborts the rest; the workspace guard
    /// removes the staging directory on every path out of this function,
    /// including panics inside the blocking sections.
    pub async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt, PublishError> {
        // Validation first: no side effect happens for a bad reference.
        let target = RepoRef::parse(&request.target)?;
        let branch = resolve_branch(request.branch.as_deref());

        tracing::info!(repo = %target, %branch, "publish started");

        self.github.verify_scopes().await?;

        // Stage and commit in a blocking task; git2 and the filesystem
        // must stay off the async runtime.
        let file_name = artifact_file_name(&request.project_name);
        let code = request.code.clone();
        let workspace = spawn_git(move || {
            let workspace = Workspace::create()?;
            workspace.commit_file(&file_name, &code, COMMIT_MESSAGE)?;
            Ok(workspace)
        })
        .await?;

        // From here down, any `?` drops `workspace` and with it the
        // staging directory.
        let outcome = self
            .github
            .ensure_repository(&target.owner, &target.repo)
            .await?;

        let remote_url = self.remote_url(&target);
        let token = self.token.clone();
        let push_branch = branch.clone();
        let workspace = spawn_git(move || {
            workspace.push_branch(&remote_url, &token, &push_branch)?;
            Ok(workspace)
        })
        .await?;

        // Teardown failure after a successful push is logged, not allowed
        // to mask the publish result.
        if let Err(err) = workspace.close() {
            tracing::warn!(error = %err, "workspace teardown failed after successful push");
        }

        tracing::info!(repo = %target, %branch, "publish finished");
        Ok(PublishReceipt {
            url: target.html_url(),
            branch,
            message: receipt_message(outcome).to_string(),
        })
    }
}

/// Run a blocking git/filesystem closure off the async runtime. A panic
/// in the closure unwinds through the workspace guard (removing the
/// staging directory) and surfaces as a local-operation failure.
async fn spawn_git<T: Send + 'static>(
    f: impl FnOnce() -> Result<T, PublishError> + Send + 'static,
) -> Result<T, PublishError> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| PublishError::local(format!("staging task failed: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::mock_api::{self, MockGithub};
    use git2::Repository;
    use std::sync::Arc;

    fn request(target: &str) -> PublishRequest {
        PublishRequest {
            code: "console.log(1)".to_string(),
            project_name: "My Tool".to_string(),
            target: target.to_string(),
            branch: Some("main".to_string()),
        }
    }

    // ── artifact_file_name ───────────────────────────────────────────

    #[test]
    fn file_name_lowercases_and_hyphenates() {
        assert_eq!(artifact_file_name("My Tool"), "my-tool.js");
    }

    #[test]
    fn file_name_collapses_whitespace_runs() {
        assert_eq!(artifact_file_name("My   Big\tTool"), "my-big-tool.js");
    }

    #[test]
    fn file_name_single_word() {
        assert_eq!(artifact_file_name("Widget"), "widget.js");
    }

    // ── publish ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn bad_reference_fails_before_any_side_effect() {
        // The api_base is unroutable: if publish tried the network the
        // error would be Unauthorized/Transport, not InvalidReference.
        let publisher = Publisher::with_api_base("ghp_test", "http://127.0.0.1:1");
        let err = publisher
            .publish(request("not-a-valid-ref"))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidReference { .. }));
    }

    #[tokio::test]
    async fn scope_check_failure_stops_the_pipeline_as_unauthorized() {
        let publisher = Publisher::with_api_base("ghp_test", "http://127.0.0.1:1");
        let err = publisher.publish(request("octo/my-tool")).await.unwrap_err();
        assert!(matches!(err, PublishError::Unauthorized));
    }

    #[test]
    fn absent_or_blank_branch_falls_back_to_main() {
        assert_eq!(resolve_branch(None), "main");
        assert_eq!(resolve_branch(Some("")), "main");
        assert_eq!(resolve_branch(Some("   ")), "main");
        assert_eq!(resolve_branch(Some("release/v2")), "release/v2");
        assert_eq!(resolve_branch(Some(" dev ")), "dev");
    }

    #[test]
    fn commit_message_is_a_fixed_constant() {
        assert_eq!(COMMIT_MESSAGE, "Initial commit from gitship");
    }

    #[test]
    fn receipt_message_reports_pre_existence_distinctly() {
        assert!(receipt_message(EnsureOutcome::Created).contains("created"));
        assert!(receipt_message(EnsureOutcome::AlreadyExists).contains("already exists"));
        assert_ne!(
            receipt_message(EnsureOutcome::Created),
            receipt_message(EnsureOutcome::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn publish_twice_reports_creation_then_pre_existence() {
        let state = Arc::new(MockGithub::default());
        let base = mock_api::serve(mock_api::router("repo", state.clone())).await;

        // A local bare repository stands in for the push target.
        let remote_dir = tempfile::tempdir().unwrap();
        Repository::init_bare(remote_dir.path()).unwrap();
        let remote_url = remote_dir.path().to_str().unwrap().to_string();

        let publisher =
            Publisher::with_api_base("ghp_test", &base).with_push_remote(remote_url);

        let first = publisher.publish(request("octo/my-tool")).await.unwrap();
        assert!(first.message.contains("created"));
        assert_eq!(first.url, "https://github.com/octo/my-tool");
        assert_eq!(first.branch, "main");

        let second = publisher.publish(request("octo/my-tool")).await.unwrap();
        assert!(second.message.contains("already exists"));
        assert_eq!(second.url, first.url);

        // One creation call total; the pushed branch holds the artifact.
        assert!(state.created_with.lock().unwrap().is_some());
        let remote = Repository::open_bare(remote_dir.path()).unwrap();
        let head = remote
            .find_branch("main", git2::BranchType::Local)
            .unwrap()
            .get()
            .peel_to_commit()
            .unwrap();
        assert!(head.tree().unwrap().get_name("my-tool.js").is_some());
    }

    #[tokio::test]
    async fn workspace_is_removed_when_a_blocking_step_panics() {
        let workspace = Workspace::create().unwrap();
        let path = workspace.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            let _workspace = workspace;
            panic!("simulated git failure");
        })
        .await;
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
