//! API Module
//!
//! HTTP handlers and routing for the site cache service.
//!
//! # Endpoints
//! - `POST /api/preview/settings` - Store preview settings, returns `{previewId}`
//! - `GET /api/preview/settings?id=<id>` - Fetch preview settings
//! - `GET|PATCH /api/sites/:username` - Site profile
//! - `GET|PATCH|DELETE /api/sites/:username/pages/:slug` - Site pages
//! - `GET /api/cache/stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
