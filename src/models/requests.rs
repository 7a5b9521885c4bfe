//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming query strings. JSON bodies (preview
//! settings, document patches) are free-form objects and are taken as
//! `serde_json` values directly.

use serde::Deserialize;

/// Query string for GET /api/preview/settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewQuery {
    /// The preview id returned when the settings were stored
    #[serde(default)]
    pub id: Option<String>,
}

impl PreviewQuery {
    /// Returns the id, or an error message if it is missing or blank.
    pub fn require_id(&self) -> Result<&str, String> {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err("Preview id is required".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_query_deserialize() {
        let query: PreviewQuery = serde_json::from_str(r#"{"id": "bob_1_abc"}"#).unwrap();
        assert_eq!(query.require_id(), Ok("bob_1_abc"));
    }

    #[test]
    fn test_preview_query_missing_id() {
        let query: PreviewQuery = serde_json::from_str("{}").unwrap();
        assert!(query.require_id().is_err());
    }

    #[test]
    fn test_preview_query_blank_id() {
        let query = PreviewQuery {
            id: Some("  ".to_string()),
        };
        assert!(query.require_id().is_err());
    }
}
