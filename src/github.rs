//! GitHub REST client: token scope verification and idempotent
//! repository ensure-exists.
//!
//! This module owns every outbound call the pipeline makes to the GitHub
//! API. Local git operations live in `publish::workspace` and
//! `publish::pipeline`.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::PublishError;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "gitship";

/// Scopes that authorize repository creation and push. The token must
/// carry at least one of them.
const REQUIRED_SCOPES: &[&str] = &["repo", "workflow"];

/// A GitHub repository (subset of fields we care about).
#[derive(Debug, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub full_name: String,
    pub name: String,
    pub private: bool,
    pub html_url: String,
}

/// Body for `POST /user/repos`. New repositories are always private and
/// never auto-initialized, so the forced push is the first content.
#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    private: bool,
    auto_init: bool,
}

/// Outcome of the ensure-exists step, kept distinct so the caller can
/// report creation vs. pre-existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyExists,
    Created,
}

pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: GITHUB_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API origin. Test hook; production
    /// code always talks to `api.github.com`.
    #[cfg(test)]
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: api_base.into(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.api_base, path))
            .header("Authorization", format!("token {}", self.token))
            .header("User-Agent", USER_AGENT)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.api_base, path))
            .header("Authorization", format!("token {}", self.token))
            .header("User-Agent", USER_AGENT)
    }

    /// Check that the token authenticates and carries a scope that can
    /// create and push repositories.
    ///
    /// One read-only call: `GET /user`, then inspect the `x-oauth-scopes`
    /// response header. Every failure mode here — transport fault, auth
    /// rejection, missing scope — collapses to `Unauthorized`, because a
    /// bad or under-scoped token is the only thing the caller can act on
    /// at this boundary.
    pub async fn verify_scopes(&self) -> Result<(), PublishError> {
        let resp = self
            .get("/user")
            .send()
            .await
            .map_err(|_| PublishError::Unauthorized)?;

        if !resp.status().is_success() {
            return Err(PublishError::Unauthorized);
        }

        let scopes: Vec<String> = resp
            .headers()
            .get("x-oauth-scopes")
            .and_then(|v| v.to_str().ok())
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        if REQUIRED_SCOPES.iter().any(|req| scopes.iter().any(|s| s == req)) {
            Ok(())
        } else {
            Err(PublishError::Unauthorized)
        }
    }

    /// Make sure `owner/repo` exists on the remote, creating it when the
    /// lookup reports 404.
    ///
    /// Idempotent by design: a second publish against the same target
    /// lands in the `AlreadyExists` arm rather than failing. Creation
    /// always goes through `POST /user/repos`, i.e. the repository is
    /// created under the authenticated account regardless of `owner`.
    pub async fn ensure_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<EnsureOutcome, PublishError> {
        let resp = self
            .get(&format!("/repos/{owner}/{repo}"))
            .send()
            .await
            .map_err(PublishError::from)?;

        match resp.status() {
            status if status.is_success() => {
                tracing::info!(%owner, %repo, "repository already exists");
                Ok(EnsureOutcome::AlreadyExists)
            }
            StatusCode::NOT_FOUND => {
                tracing::info!(%owner, %repo, "repository not found, creating");
                self.create_repository(repo).await?;
                Ok(EnsureOutcome::Created)
            }
            status => Err(PublishError::RemoteFailure {
                status: Some(status.as_u16()),
                message: format!("Error checking repository {owner}/{repo}"),
            }),
        }
    }

    async fn create_repository(&self, name: &str) -> Result<GitHubRepo, PublishError> {
        let resp = self
            .post("/user/repos")
            .json(&CreateRepoRequest {
                name,
                private: true,
                auto_init: false,
            })
            .send()
            .await
            .map_err(PublishError::from)?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            return Err(PublishError::RemoteFailure {
                status: Some(status.as_u16()),
                message: format!("Failed to create repository {name}"),
            });
        }

        let repo: GitHubRepo = resp.json().await.map_err(PublishError::from)?;
        tracing::info!(repo = %repo.full_name, "repository created");
        Ok(repo)
    }
}

/// In-process GitHub API stand-in for tests: canned `/user`,
/// `/repos/{owner}/{repo}`, and `/user/repos` responses behind a real
/// listener, so the client code paths run against actual HTTP.
#[cfg(test)]
pub(crate) mod mock_api {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    };

    /// Remote-side state: whether the repository exists, and the body the
    /// client sent when creating it.
    #[derive(Default)]
    pub struct MockGithub {
        pub repo_exists: AtomicBool,
        pub created_with: Mutex<Option<serde_json::Value>>,
    }

    /// Router answering `/user` with the given scopes header and the
    /// repository endpoints from the shared state.
    pub fn router(scopes: &'static str, state: Arc<MockGithub>) -> Router {
        Router::new()
            .route(
                "/user",
                get(move || async move {
                    (
                        [("x-oauth-scopes", scopes)],
                        Json(serde_json::json!({ "login": "octo" })),
                    )
                }),
            )
            .route("/repos/{owner}/{repo}", get(lookup_repo))
            .route("/user/repos", post(create_repo))
            .with_state(state)
    }

    async fn lookup_repo(State(state): State<Arc<MockGithub>>) -> axum::response::Response {
        if state.repo_exists.load(Ordering::SeqCst) {
            (StatusCode::OK, Json(repo_payload())).into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }

    async fn create_repo(
        State(state): State<Arc<MockGithub>>,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        *state.created_with.lock().unwrap() = Some(body);
        state.repo_exists.store(true, Ordering::SeqCst);
        (StatusCode::CREATED, Json(repo_payload()))
    }

    fn repo_payload() -> serde_json::Value {
        serde_json::json!({
            "full_name": "octo/my-tool",
            "name": "my-tool",
            "private": true,
            "html_url": "https://github.com/octo/my-tool"
        })
    }

    /// Serve a router on an ephemeral local port; returns the base URL.
    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }
}
