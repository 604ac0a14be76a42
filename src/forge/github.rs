//! forge::github
//!
//! GitHub implementation of [`GitDataApi`] over the REST Git Data API.
//!
//! # Endpoints
//!
//! | Operation       | Request                                         |
//! |-----------------|-------------------------------------------------|
//! | `branch_head`   | `GET  /repos/{owner}/{repo}/branches/{branch}`  |
//! | `commit_tree`   | `GET  /repos/{owner}/{repo}/git/commits/{sha}`  |
//! | `create_blob`   | `POST /repos/{owner}/{repo}/git/blobs`          |
//! | `create_tree`   | `POST /repos/{owner}/{repo}/git/trees`          |
//! | `create_commit` | `POST /repos/{owner}/{repo}/git/commits`        |
//! | `update_ref`    | `POST /repos/{owner}/{repo}/git/refs/{ref}`     |
//!
//! The ref update is sent with `force: false`, so GitHub rejects it with
//! 422 when the branch no longer contains the parent commit. That is the
//! only compare-and-swap available without an extra round trip.
//!
//! # Authentication
//!
//! The [`TokenProvider`] is consulted for every request.
//!
//! # Timeouts
//!
//! Every request carries the configured timeout; a hung API call surfaces
//! as [`ForgeError::NetworkError`] instead of blocking the caller forever.
//!
//! # Example
//!
//! ```ignore
//! use quarto_press::auth::EnvTokenProvider;
//! use quarto_press::forge::github::GitHubDataApi;
//! use std::sync::Arc;
//!
//! let api = GitHubDataApi::new(Arc::new(EnvTokenProvider::default()), "octocat", "site")?;
//! let head = api.branch_head(&BranchName::main()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{ForgeError, GitDataApi, NewCommit, TreeEntry};
use crate::auth::TokenProvider;
use crate::core::config::DEFAULT_API_BASE;
use crate::core::types::{BranchName, Oid, RefName};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "quarto-press";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub Git Data API client for one repository.
pub struct GitHubDataApi {
    /// HTTP client for making requests
    client: Client,
    /// Token source, consulted per request
    token_provider: Arc<dyn TokenProvider>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

impl std::fmt::Debug for GitHubDataApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubDataApi")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubDataApi {
    /// Create a client against `api.github.com` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::NetworkError` if the HTTP client cannot be built.
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, ForgeError> {
        Self::with_options(provider, owner, repo, DEFAULT_API_BASE, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom API base URL and request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::NetworkError` if the HTTP client cannot be built.
    pub fn with_options(
        provider: Arc<dyn TokenProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            token_provider: provider,
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build common headers for API requests.
    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self.token_provider.bearer_token().await.map_err(|e| match e {
            crate::auth::AuthError::NotAuthenticated(_) => ForgeError::AuthRequired,
            other => ForgeError::AuthFailed(other.to_string()),
        })?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ForgeError> {
        let url = self.repo_url(path);
        debug!(method = "GET", %url, "github request");
        let response = self
            .client
            .get(&url)
            .headers(self.headers().await?)
            .send()
            .await
            .map_err(map_transport_error)?;
        self.handle_response(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ForgeError> {
        let url = self.repo_url(path);
        debug!(method = "POST", %url, "github request");
        let response = self
            .client
            .post(&url)
            .headers(self.headers().await?)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ForgeError::Malformed(format!("failed to parse response: {}", e)))
        } else {
            Err(self.error_from_response(response, status).await)
        }
    }

    /// Map an error response from the API.
    async fn error_from_response(&self, response: Response, status: StatusCode) -> ForgeError {
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if message.to_ascii_lowercase().contains("rate limit") => {
                ForgeError::RateLimited
            }
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY
                if message.to_ascii_lowercase().contains("fast forward") =>
            {
                ForgeError::NotFastForward(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> ForgeError {
    if e.is_timeout() {
        ForgeError::NetworkError(format!("request timed out: {}", e))
    } else {
        ForgeError::NetworkError(e.to_string())
    }
}

fn parse_oid(raw: String) -> Result<Oid, ForgeError> {
    Oid::new(raw).map_err(|e| ForgeError::Malformed(e.to_string()))
}

#[async_trait]
impl GitDataApi for GitHubDataApi {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn branch_head(&self, branch: &BranchName) -> Result<Oid, ForgeError> {
        let body: GitHubBranch = self.get_json(&format!("branches/{}", branch)).await?;
        parse_oid(body.commit.sha)
    }

    async fn commit_tree(&self, commit: &Oid) -> Result<Oid, ForgeError> {
        let body: GitHubCommit = self.get_json(&format!("git/commits/{}", commit)).await?;
        parse_oid(body.tree.sha)
    }

    async fn create_blob(&self, content: &str) -> Result<Oid, ForgeError> {
        let body = CreateBlobBody {
            content,
            encoding: "utf-8",
        };
        let created: GitHubSha = self.post_json("git/blobs", &body).await?;
        parse_oid(created.sha)
    }

    async fn create_tree(&self, base_tree: &Oid, entries: &[TreeEntry]) -> Result<Oid, ForgeError> {
        let body = CreateTreeBody {
            base_tree: base_tree.as_str(),
            tree: entries
                .iter()
                .map(|e| TreeEntryBody {
                    path: &e.path,
                    mode: TreeEntry::MODE,
                    kind: TreeEntry::KIND,
                    sha: e.sha.as_str(),
                })
                .collect(),
        };
        let created: GitHubSha = self.post_json("git/trees", &body).await?;
        parse_oid(created.sha)
    }

    async fn create_commit(&self, commit: &NewCommit) -> Result<Oid, ForgeError> {
        let body = CreateCommitBody {
            message: &commit.message,
            author: AuthorBody {
                name: &commit.author.name,
                email: &commit.author.email,
            },
            parents: commit.parents.iter().map(Oid::as_str).collect(),
            tree: commit.tree.as_str(),
        };
        let created: GitHubSha = self.post_json("git/commits", &body).await?;
        parse_oid(created.sha)
    }

    async fn update_ref(&self, reference: &RefName, sha: &Oid) -> Result<(), ForgeError> {
        let body = UpdateRefBody {
            reference: reference.as_str(),
            sha: sha.as_str(),
            force: false,
        };
        let _: serde_json::Value = self
            .post_json(&format!("git/refs/{}", reference.short()), &body)
            .await?;
        Ok(())
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: Vec<TreeEntryBody<'a>>,
}

#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    author: AuthorBody<'a>,
    parents: Vec<&'a str>,
    tree: &'a str,
}

#[derive(Serialize)]
struct AuthorBody<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    #[serde(rename = "ref")]
    reference: &'a str,
    sha: &'a str,
    force: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubBranch {
    commit: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubCommit {
    tree: GitHubSha,
}
