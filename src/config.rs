//! Process configuration, loaded once at startup from the environment.

use std::net::SocketAddr;

const DEFAULT_PORT: u16 = 5000;

/// Runtime settings for the service.
///
/// The GitHub token is the only secret: it is loaded once, shared
/// read-only across requests, and never logged in full. Absence is a
/// legal state — the caller layer reports it as a configuration error
/// per request, before any network or filesystem action.
#[derive(Debug, Clone)]
pub struct Settings {
    pub github_token: Option<String>,
    pub port: u16,
}

impl Settings {
    /// Read settings from the environment. `.env` files are handled by
    /// the binary (via `dotenvy`) before this runs.
    pub fn from_env() -> Self {
        let github_token = std::env::var("GITHUB_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self { github_token, port }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Token form safe to put in logs: first four characters, rest elided.
    pub fn redacted_token(&self) -> String {
        match &self.github_token {
            // Counted in chars, not bytes: slicing must not split a
            // multibyte character.
            Some(token) if token.chars().count() > 4 => {
                format!("{}…", token.chars().take(4).collect::<String>())
            }
            Some(_) => "****".to_string(),
            None => "<unset>".to_string(),
        }
    }
}
