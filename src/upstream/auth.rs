//! Authentication boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AppError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Auth provider unavailable: {0}")]
    Provider(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::Provider(_) => AppError::Upstream(err.to_string()),
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// User id; owners are matched against a resource's user id
    pub id: String,
}

/// Verifies bearer tokens issued by the authentication provider.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify_bearer_token(&self, token: &str) -> Result<Subject, AuthError>;
}

/// Authenticator backed by a fixed token table.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    /// `tokens` maps bearer token to subject id.
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, subject_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), subject_id.into());
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn verify_bearer_token(&self, token: &str) -> Result<Subject, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .get(token)
            .map(|id| Subject { id: id.clone() })
            .ok_or(AuthError::InvalidToken)
    }
}
