//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::upstream::Document;

/// Response body for POST /api/preview/settings
#[derive(Debug, Clone, Serialize)]
pub struct PreviewCreatedResponse {
    /// Id to pass to the preview renderer
    #[serde(rename = "previewId")]
    pub preview_id: String,
}

impl PreviewCreatedResponse {
    pub fn new(preview_id: impl Into<String>) -> Self {
        Self {
            preview_id: preview_id.into(),
        }
    }
}

/// Response body for GET /api/preview/settings
#[derive(Debug, Clone, Serialize)]
pub struct PreviewSettingsResponse {
    /// The settings exactly as submitted
    pub settings: Value,
}

impl PreviewSettingsResponse {
    pub fn new(settings: Value) -> Self {
        Self { settings }
    }
}

/// Response body for site and page reads and updates
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub document: Document,
}

impl DocumentResponse {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

/// Response body for DELETE /api/sites/:username/pages/:slug
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
}

impl DeleteResponse {
    pub fn new(slug: &str) -> Self {
        Self {
            message: format!("Page '{}' deleted successfully", slug),
        }
    }
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Previews currently held, including expired ones not yet swept
    pub previews: usize,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, previews: usize) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            previews,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preview_created_uses_camel_case() {
        let resp = PreviewCreatedResponse::new("bob_1_abc");
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"previewId": "bob_1_abc"})
        );
    }

    #[test]
    fn test_preview_settings_serialize() {
        let resp = PreviewSettingsResponse::new(json!({"username": "bob", "theme": "dark"}));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"settings": {"username": "bob", "theme": "dark"}})
        );
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let json = serde_json::to_value(StatsResponse::new(stats, 2)).unwrap();
        assert_eq!(json["hits"], 3);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["previews"], 2);
        assert!((json["hit_rate"].as_f64().unwrap() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_delete_response_serialize() {
        let resp = DeleteResponse::new("about");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("about"));
        assert!(json.contains("deleted"));
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
