//! Site Service
//!
//! Users are cached under `user:<username>` and pages under
//! `page:<userId>:<slug>`. Page edits patch the cached copy in place, profile
//! edits drop the user entry and every cached page of that user.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use crate::cache::{CacheKey, FetchOptions, TtlCache};
use crate::error::{AppError, Result};
use crate::upstream::{Document, DocumentStore, Filter, Subject, PAGES, USERS};

/// Page fields a patch may not touch.
const PROTECTED_PAGE_FIELDS: &[&str] = &["id", "userId", "slug"];

/// User fields a patch may not touch.
const PROTECTED_USER_FIELDS: &[&str] = &["id", "username"];

pub struct SiteService {
    documents: Arc<dyn DocumentStore>,
    cache: Arc<TtlCache<Document>>,
}

impl SiteService {
    pub fn new(documents: Arc<dyn DocumentStore>, cache: Arc<TtlCache<Document>>) -> Self {
        Self { documents, cache }
    }

    pub fn cache(&self) -> &Arc<TtlCache<Document>> {
        &self.cache
    }

    // == Reads ==
    /// The user document for `username`, served from cache when fresh.
    pub async fn user_by_username(&self, username: &str) -> Result<Document> {
        let key = CacheKey::user(username)?;
        self.cache
            .get_or_fetch(&key, move || self.load_user(username), FetchOptions::default())
            .await
    }

    /// The page `slug` owned by `username`, served from cache when fresh.
    pub async fn page(&self, username: &str, slug: &str) -> Result<Document> {
        let user = self.user_by_username(username).await?;
        let user_id = user.id.as_str();
        let key = CacheKey::page(user_id, slug)?;
        self.cache
            .get_or_fetch(&key, move || self.load_page(user_id, slug), FetchOptions::default())
            .await
    }

    async fn load_user(&self, username: &str) -> Result<Document> {
        self.documents
            .find_one(USERS, &[Filter::eq("username", username)])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{username}' not found")))
    }

    async fn load_page(&self, user_id: &str, slug: &str) -> Result<Document> {
        self.documents
            .find_one(PAGES, &[Filter::eq("userId", user_id), Filter::eq("slug", slug)])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page '{slug}' not found")))
    }

    // == Writes ==
    /// Merges `patch` into a page owned by the caller.
    ///
    /// The cached page, if any, is patched in place and keeps its TTL.
    pub async fn update_page(
        &self,
        subject: &Subject,
        username: &str,
        slug: &str,
        patch: Map<String, Value>,
    ) -> Result<Document> {
        validate_patch(&patch, PROTECTED_PAGE_FIELDS)?;
        let user = self.owned_user(subject, username).await?;
        let page = self.page(username, slug).await?;

        let updated = self.documents.update(PAGES, &page.id, patch.clone()).await?;

        let key = CacheKey::page(&user.id, slug)?;
        self.cache
            .update(key.as_str(), |cached| cached.merge(&patch))
            .await;
        info!(user_id = %user.id, slug, "Page updated");
        Ok(updated)
    }

    /// Deletes a page owned by the caller and drops its cache entry.
    pub async fn delete_page(&self, subject: &Subject, username: &str, slug: &str) -> Result<()> {
        let user = self.owned_user(subject, username).await?;
        let page = self.page(username, slug).await?;

        self.documents.delete(PAGES, &page.id).await?;

        self.cache.invalidate(CacheKey::page(&user.id, slug)?.as_str()).await;
        info!(user_id = %user.id, slug, "Page deleted");
        Ok(())
    }

    /// Merges `patch` into the caller's own profile.
    ///
    /// Pages render with profile and theme data, so every cached page of the
    /// user is dropped along with the user entry.
    pub async fn update_profile(
        &self,
        subject: &Subject,
        username: &str,
        patch: Map<String, Value>,
    ) -> Result<Document> {
        validate_patch(&patch, PROTECTED_USER_FIELDS)?;
        let user = self.owned_user(subject, username).await?;

        let updated = self.documents.update(USERS, &user.id, patch).await?;

        self.cache.invalidate(CacheKey::user(username)?.as_str()).await;
        let pages = self
            .cache
            .invalidate_by_prefix(&CacheKey::page_prefix(&user.id)?)
            .await;
        info!(user_id = %user.id, cached_pages_dropped = pages, "Profile updated");
        Ok(updated)
    }

    async fn owned_user(&self, subject: &Subject, username: &str) -> Result<Document> {
        let user = self.user_by_username(username).await?;
        if user.id != subject.id {
            return Err(AppError::Forbidden(format!(
                "Site '{username}' belongs to another user"
            )));
        }
        Ok(user)
    }
}

fn validate_patch(patch: &Map<String, Value>, protected: &[&str]) -> Result<()> {
    if patch.is_empty() {
        return Err(AppError::Validation("Patch cannot be empty".to_string()));
    }
    if let Some(field) = protected.iter().find(|field| patch.contains_key(**field)) {
        return Err(AppError::Validation(format!("Field '{field}' cannot be changed")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use crate::clock::ManualClock;
    use crate::upstream::MemoryDocumentStore;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn seeded() -> (SiteService, Arc<MemoryDocumentStore>) {
        let documents = Arc::new(MemoryDocumentStore::new());
        documents
            .upsert(USERS, "u1", fields(json!({"username": "alice", "theme": "light"})))
            .await
            .unwrap();
        documents
            .upsert(USERS, "u2", fields(json!({"username": "bob"})))
            .await
            .unwrap();
        documents
            .upsert(
                PAGES,
                "p1",
                fields(json!({"userId": "u1", "slug": "about", "title": "About"})),
            )
            .await
            .unwrap();
        documents
            .upsert(
                PAGES,
                "p2",
                fields(json!({"userId": "u1", "slug": "now", "title": "Now"})),
            )
            .await
            .unwrap();

        let cache = Arc::new(TtlCache::new(
            CacheSettings::default(),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        ));
        (SiteService::new(documents.clone(), cache), documents)
    }

    fn alice() -> Subject {
        Subject { id: "u1".to_string() }
    }

    #[tokio::test]
    async fn test_user_lookup_is_cached() {
        let (service, documents) = seeded().await;

        let first = service.user_by_username("alice").await.unwrap();
        documents.set_unavailable(true);
        let second = service.user_by_username("alice").await.unwrap();

        assert_eq!(first, second);
        assert!(service.cache().entry("user:alice").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_user_not_cached() {
        let (service, _) = seeded().await;

        let err = service.user_by_username("nobody").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.cache().entry("user:nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let (service, documents) = seeded().await;
        documents.set_unavailable(true);

        let err = service.user_by_username("alice").await.unwrap_err();

        assert!(matches!(err, AppError::Upstream(_)));
        assert!(service.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_page_cached_under_user_id() {
        let (service, _) = seeded().await;

        let page = service.page("alice", "about").await.unwrap();

        assert_eq!(page.id, "p1");
        assert!(service.cache().entry("page:u1:about").await.is_some());
    }

    #[tokio::test]
    async fn test_page_of_other_user_not_found() {
        let (service, _) = seeded().await;
        assert!(matches!(
            service.page("bob", "about").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_page_patches_cache_in_place() {
        let (service, _) = seeded().await;
        service.page("alice", "about").await.unwrap();
        let before = service.cache().entry("page:u1:about").await.unwrap();

        let updated = service
            .update_page(&alice(), "alice", "about", fields(json!({"title": "About me"})))
            .await
            .unwrap();

        assert_eq!(updated.str_field("title"), Some("About me"));
        let after = service.cache().entry("page:u1:about").await.unwrap();
        assert_eq!(after.value.str_field("title"), Some("About me"));
        assert_eq!(after.expires_at, before.expires_at);
    }

    #[tokio::test]
    async fn test_update_page_requires_owner() {
        let (service, _) = seeded().await;
        let mallory = Subject { id: "u2".to_string() };

        let err = service
            .update_page(&mallory, "alice", "about", fields(json!({"title": "pwned"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        let page = service.page("alice", "about").await.unwrap();
        assert_eq!(page.str_field("title"), Some("About"));
    }

    #[tokio::test]
    async fn test_update_page_rejects_protected_fields() {
        let (service, _) = seeded().await;

        for patch in [json!({}), json!({"slug": "x"}), json!({"userId": "u2"})] {
            let err = service
                .update_page(&alice(), "alice", "about", fields(patch))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_delete_page_invalidates() {
        let (service, _) = seeded().await;
        service.page("alice", "about").await.unwrap();

        service.delete_page(&alice(), "alice", "about").await.unwrap();

        assert!(service.cache().entry("page:u1:about").await.is_none());
        assert!(matches!(
            service.page("alice", "about").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_drops_user_and_pages() {
        let (service, _) = seeded().await;
        service.page("alice", "about").await.unwrap();
        service.page("alice", "now").await.unwrap();
        service.user_by_username("bob").await.unwrap();

        let updated = service
            .update_profile(&alice(), "alice", fields(json!({"theme": "dark"})))
            .await
            .unwrap();

        assert_eq!(updated.str_field("theme"), Some("dark"));
        let cache = service.cache();
        assert!(cache.entry("user:alice").await.is_none());
        assert!(cache.entry("page:u1:about").await.is_none());
        assert!(cache.entry("page:u1:now").await.is_none());
        assert!(cache.entry("user:bob").await.is_some());

        let reloaded = service.user_by_username("alice").await.unwrap();
        assert_eq!(reloaded.str_field("theme"), Some("dark"));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_username_change() {
        let (service, _) = seeded().await;
        let err = service
            .update_profile(&alice(), "alice", fields(json!({"username": "eve"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
