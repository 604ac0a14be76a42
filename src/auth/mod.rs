//! auth
//!
//! Bearer-token credentials for the GitHub API.
//!
//! # Architecture
//!
//! The publisher never owns a token. It asks a [`TokenProvider`] for one
//! on every request, so a token rotated in the environment is picked up
//! without restarting a long-running scheduler.
//!
//! # Security
//!
//! Tokens MUST never appear in logs (including `--debug`), error messages
//! or `Debug` output. Every type here redacts them.
//!
//! # Example
//!
//! ```ignore
//! use quarto_press::auth::{EnvTokenProvider, TokenProvider};
//!
//! let provider = EnvTokenProvider::default();
//! let token = provider.bearer_token().await?;
//! ```

use async_trait::async_trait;
use thiserror::Error;

/// Environment variable holding the GitHub token.
pub const TOKEN_ENV_VAR: &str = "GH_TOKEN";

/// Errors from credential lookup.
///
/// Error messages intentionally do not include token values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No token is available.
    #[error("no GitHub token found; set {0}")]
    NotAuthenticated(String),

    /// A token was found but is unusable.
    #[error("invalid GitHub token: {0}")]
    InvalidToken(String),
}

/// Provides bearer tokens to forge adapters.
///
/// Implementors must never log or expose token values.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for the next request.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if no token exists
    /// - [`AuthError::InvalidToken`] if the token is malformed
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Check if a token is available without validating it remotely.
    fn is_authenticated(&self) -> bool;
}

/// Validate the shape of a token before it is put into a header.
pub fn validate_token(token: &str) -> Result<(), AuthError> {
    if token.is_empty() {
        return Err(AuthError::InvalidToken("token is empty".into()));
    }
    if token.len() < 10 {
        return Err(AuthError::InvalidToken("token is too short".into()));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidToken(
            "token contains whitespace".into(),
        ));
    }
    Ok(())
}

/// Reads the token from an environment variable at call time.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    /// Read from a custom variable instead of `GH_TOKEN`.
    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::with_var(TOKEN_ENV_VAR)
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        let token = std::env::var(&self.var)
            .map_err(|_| AuthError::NotAuthenticated(self.var.clone()))?;
        let token = token.trim().to_string();
        validate_token(&token)?;
        Ok(token)
    }

    fn is_authenticated(&self) -> bool {
        std::env::var(&self.var)
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A fixed token, for tests and one-shot tools.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        validate_token(&self.token)?;
        Ok(self.token.clone())
    }

    fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}
