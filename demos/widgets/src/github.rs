//! GitHub REST client
//!
//! The fetch runs as a keyed task; its result comes back to the runtime as
//! deferred work that patches `github_user`, `github_user_loading` and
//! `github_user_error`.

use dom_dispatch::{patch, Deferred, Patch, Result, Runtime};
use serde_json::Value;

use crate::state::{AppState, GithubUser};

pub const DEFAULT_API: &str = "https://api.github.com";

/// Task key of the in-flight user fetch
pub const FETCH_TASK: &str = "github-user";

/// Fetch error type
#[derive(Debug)]
pub enum FetchError {
    Request(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Request(e) => write!(f, "Request failed: {}", e),
            FetchError::Status(status) => write!(f, "HTTP error! status: {}", status.as_u16()),
        }
    }
}

impl std::error::Error for FetchError {}

/// Thin client over the users endpoint
#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GithubClient {
    pub fn new(base_url: impl Into<String>) -> std::result::Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("dom-dispatch-widgets/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Request)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint for `login`, percent-encoded as a single path segment
    pub fn user_url(&self, login: &str) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(login))
    }

    pub async fn fetch_user(&self, login: &str) -> std::result::Result<GithubUser, FetchError> {
        let response = self
            .http
            .get(self.user_url(login))
            .send()
            .await
            .map_err(FetchError::Request)?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        response.json().await.map_err(FetchError::Request)
    }
}

/// Mark a fetch for `login` as started and spawn it
///
/// A fetch already in flight is cancelled.
pub fn start_fetch(rt: &mut Runtime<AppState>, client: &GithubClient, login: &str) -> Result<()> {
    tracing::info!(login, "Fetching GitHub user");
    rt.set_state(
        Patch::new()
            .set("github_user", Value::Null)
            .set("github_user_loading", true)
            .set("github_user_error", Value::Null)
            .set("github_query", login),
    )?;

    let client = client.clone();
    let login = login.to_string();
    rt.tasks_mut().spawn(FETCH_TASK, async move {
        let result = client
            .fetch_user(&login)
            .await
            .map_err(|e| e.to_string());
        Box::new(move |rt: &mut Runtime<AppState>| finish_fetch(rt, result)) as Deferred<AppState>
    });
    Ok(())
}

/// Apply a finished fetch to the state
///
/// Dropped unless a fetch is still marked loading.
pub fn finish_fetch(
    rt: &mut Runtime<AppState>,
    result: std::result::Result<GithubUser, String>,
) -> Result<()> {
    if !rt.state().github_user_loading {
        tracing::debug!("Ignoring GitHub result with no fetch pending");
        return Ok(());
    }
    match result {
        Ok(user) => {
            tracing::debug!(login = %user.login, "GitHub user loaded");
            rt.set_state(
                Patch::new()
                    .set("github_user", serde_json::to_value(&user)?)
                    .set("github_user_loading", false),
            )
        }
        Err(error) => {
            tracing::warn!(%error, "GitHub user fetch failed");
            rt.set_state(patch!({
                "github_user": null,
                "github_user_loading": false,
                "github_user_error": error,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_url_trims_trailing_slash() {
        let client = GithubClient::new("http://localhost:9999/").unwrap();
        assert_eq!(client.user_url("octocat"), "http://localhost:9999/users/octocat");
    }

    #[test]
    fn test_user_url_encodes_login_as_one_segment() {
        let client = GithubClient::new("http://localhost:9999").unwrap();
        assert_eq!(client.user_url("a b"), "http://localhost:9999/users/a%20b");

        let url = reqwest::Url::parse(&client.user_url("a/../x?y=1#frag")).unwrap();
        assert_eq!(url.path(), "/users/a%2F..%2Fx%3Fy%3D1%23frag");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_status_error_message() {
        let err = FetchError::Status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "HTTP error! status: 404");
    }
}
