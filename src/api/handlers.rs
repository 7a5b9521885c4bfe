//! API Handlers
//!
//! HTTP request handlers for the preview, site and diagnostics endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde_json::{Map, Value};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    DeleteResponse, DocumentResponse, HealthResponse, PreviewCreatedResponse, PreviewQuery,
    PreviewSettingsResponse, StatsResponse,
};
use crate::preview::PreviewStore;
use crate::sites::SiteService;
use crate::upstream::{
    AuthError, Authenticator, Document, DocumentStore, StaticTokenAuthenticator, Subject,
};

/// Application state shared across all handlers.
///
/// Owns the process-local data cache and preview store. Nothing in here is
/// shared with other server instances.
#[derive(Clone)]
pub struct AppState {
    /// Data cache over document store reads
    pub cache: Arc<TtlCache<Document>>,
    /// Ephemeral preview settings
    pub previews: Arc<PreviewStore>,
    /// Cached site reads and owner-only writes
    pub sites: Arc<SiteService>,
    /// Bearer token verification
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(
        cache: Arc<TtlCache<Document>>,
        previews: Arc<PreviewStore>,
        documents: Arc<dyn DocumentStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        let sites = Arc::new(SiteService::new(documents, cache.clone()));
        Self {
            cache,
            previews,
            sites,
            auth,
        }
    }

    /// Creates a new AppState from configuration, reading wall-clock time.
    pub fn from_config(config: &Config, documents: Arc<dyn DocumentStore>) -> Self {
        let cache = Arc::new(TtlCache::with_system_clock(config.cache_settings()));
        let previews = Arc::new(PreviewStore::with_system_clock(config.preview_settings()));
        let auth = Arc::new(StaticTokenAuthenticator::new(config.auth_tokens.clone()));
        Self::new(cache, previews, documents, auth)
    }
}

/// Verifies the `Authorization: Bearer <token>` header.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Subject> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    Ok(state.auth.verify_bearer_token(token).await?)
}

/// Handler for POST /api/preview/settings
///
/// Stores preview settings and returns the id to preview them with.
pub async fn create_preview_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PreviewCreatedResponse>> {
    let Json(settings) = body?;
    let preview_id = state.previews.store(settings).await?;
    Ok(Json(PreviewCreatedResponse::new(preview_id)))
}

/// Handler for GET /api/preview/settings?id=<id>
pub async fn get_preview_handler(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewSettingsResponse>> {
    let id = query.require_id().map_err(AppError::Validation)?;
    let settings = state.previews.retrieve(id).await?;

    Ok(Json(PreviewSettingsResponse::new(settings.as_ref().clone())))
}

/// Handler for GET /api/sites/:username
pub async fn get_site_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<DocumentResponse>> {
    let user = state.sites.user_by_username(&username).await?;
    Ok(Json(DocumentResponse::new(user)))
}

/// Handler for PATCH /api/sites/:username
pub async fn update_site_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    body: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<DocumentResponse>> {
    let subject = authenticate(&state, &headers).await?;
    let Json(patch) = body?;
    let user = state.sites.update_profile(&subject, &username, patch).await?;
    Ok(Json(DocumentResponse::new(user)))
}

/// Handler for GET /api/sites/:username/pages/:slug
pub async fn get_page_handler(
    State(state): State<AppState>,
    Path((username, slug)): Path<(String, String)>,
) -> Result<Json<DocumentResponse>> {
    let page = state.sites.page(&username, &slug).await?;
    Ok(Json(DocumentResponse::new(page)))
}

/// Handler for PATCH /api/sites/:username/pages/:slug
pub async fn update_page_handler(
    State(state): State<AppState>,
    Path((username, slug)): Path<(String, String)>,
    headers: HeaderMap,
    body: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<DocumentResponse>> {
    let subject = authenticate(&state, &headers).await?;
    let Json(patch) = body?;
    let page = state
        .sites
        .update_page(&subject, &username, &slug, patch)
        .await?;
    Ok(Json(DocumentResponse::new(page)))
}

/// Handler for DELETE /api/sites/:username/pages/:slug
pub async fn delete_page_handler(
    State(state): State<AppState>,
    Path((username, slug)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>> {
    let subject = authenticate(&state, &headers).await?;
    state.sites.delete_page(&subject, &username, &slug).await?;
    Ok(Json(DeleteResponse::new(&slug)))
}

/// Handler for GET /api/cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    let previews = state.previews.len().await;
    Json(StatsResponse::new(stats, previews))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
