//! Cache Key Module
//!
//! Validated cache keys and the namespaced constructors used by site lookups.

use std::fmt;

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{AppError, Result};

/// Namespace for user documents looked up by username
pub const USER_NAMESPACE: &str = "user:";

/// Namespace for page documents looked up by owner and slug
pub const PAGE_NAMESPACE: &str = "page:";

// == Cache Key ==
/// A non-empty cache key of at most [`MAX_KEY_LENGTH`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validates and wraps an arbitrary key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(AppError::Validation("Cache key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(AppError::Validation(format!(
                "Cache key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        Ok(Self(key))
    }

    /// `user:<username>`
    pub fn user(username: &str) -> Result<Self> {
        require_segment("username", username)?;
        Self::new(format!("{USER_NAMESPACE}{username}"))
    }

    /// `page:<user_id>:<slug>`
    pub fn page(user_id: &str, slug: &str) -> Result<Self> {
        require_segment("slug", slug)?;
        Self::new(format!("{}{slug}", Self::page_prefix(user_id)?))
    }

    /// `page:<user_id>:`, the prefix shared by every page of one user.
    pub fn page_prefix(user_id: &str) -> Result<String> {
        require_segment("user id", user_id)?;
        Ok(format!("{PAGE_NAMESPACE}{user_id}:"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn require_segment(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{name} cannot be empty")));
    }
    Ok(())
}
