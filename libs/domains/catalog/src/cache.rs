//! Read-through cache for assembled product detail views.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::ProductDetail;

/// TTL for cached detail views (10 minutes)
const DETAIL_TTL: Duration = Duration::from_secs(600);

fn detail_key(product_id: Uuid) -> String {
    format!("product:detail:{}", product_id)
}

/// Cache for assembled [`ProductDetail`] snapshots, keyed by product id.
///
/// The cache is an availability optimization, never a source of truth:
/// callers treat every error from it as a miss and fall through to the
/// store. Entries are immutable snapshots; mutations invalidate, they never
/// patch an entry in place.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetailCache: Send + Sync {
    async fn get(&self, product_id: Uuid) -> CatalogResult<Option<ProductDetail>>;

    async fn set(&self, detail: &ProductDetail) -> CatalogResult<()>;

    async fn invalidate(&self, product_id: Uuid) -> CatalogResult<()>;
}

/// Redis-backed detail cache storing JSON snapshots with a fixed TTL.
#[derive(Clone)]
pub struct RedisDetailCache {
    redis: ConnectionManager,
}

impl RedisDetailCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl DetailCache for RedisDetailCache {
    async fn get(&self, product_id: Uuid) -> CatalogResult<Option<ProductDetail>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(detail_key(product_id)).await?;

        match value {
            Some(json) => match serde_json::from_str(&json) {
                Ok(detail) => Ok(Some(detail)),
                Err(err) => {
                    // A stale or foreign payload is a miss, not a failure
                    tracing::warn!(product_id = %product_id, error = %err, "Discarding undecodable cache entry");
                    let _: () = conn.del(detail_key(product_id)).await?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set(&self, detail: &ProductDetail) -> CatalogResult<()> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(detail)
            .map_err(|e| crate::error::CatalogError::Cache(e.to_string()))?;
        conn.set_ex::<_, _, ()>(detail_key(detail.id), json, DETAIL_TTL.as_secs())
            .await?;
        Ok(())
    }

    async fn invalidate(&self, product_id: Uuid) -> CatalogResult<()> {
        let mut conn = self.redis.clone();
        let _: () = conn.del(detail_key(product_id)).await?;
        Ok(())
    }
}

/// In-memory detail cache (for tests), honoring the same TTL semantics.
#[derive(Clone)]
pub struct InMemoryDetailCache {
    entries: Arc<RwLock<HashMap<Uuid, (ProductDetail, Instant)>>>,
    ttl: Duration,
}

impl InMemoryDetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache with a custom TTL, so expiry can be exercised without waiting.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::default(),
            ttl,
        }
    }
}

impl Default for InMemoryDetailCache {
    fn default() -> Self {
        Self::with_ttl(DETAIL_TTL)
    }
}

#[async_trait]
impl DetailCache for InMemoryDetailCache {
    async fn get(&self, product_id: Uuid) -> CatalogResult<Option<ProductDetail>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&product_id)
            .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
            .map(|(detail, _)| detail.clone()))
    }

    async fn set(&self, detail: &ProductDetail) -> CatalogResult<()> {
        self.entries
            .write()
            .await
            .insert(detail.id, (detail.clone(), Instant::now()));
        Ok(())
    }

    async fn invalidate(&self, product_id: Uuid) -> CatalogResult<()> {
        self.entries.write().await.remove(&product_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionToken;

    fn detail(id: Uuid) -> ProductDetail {
        ProductDetail {
            id,
            name: "Shirt".to_string(),
            slug: "shirt".to_string(),
            description: None,
            base_price_cents: 1999,
            is_published: true,
            category_name: "Apparel".to_string(),
            brand_name: None,
            image_urls: vec![],
            variants: vec![],
            version_token: VersionToken::fresh(),
        }
    }

    #[tokio::test]
    async fn set_then_get_returns_snapshot() {
        let cache = InMemoryDetailCache::new();
        let id = Uuid::now_v7();
        cache.set(&detail(id)).await.unwrap();

        let hit = cache.get(id).await.unwrap();
        assert_eq!(hit.unwrap().id, id);
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = InMemoryDetailCache::new();
        let id = Uuid::now_v7();
        cache.set(&detail(id)).await.unwrap();
        cache.invalidate(id).await.unwrap();

        assert!(cache.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_id_is_a_miss() {
        let cache = InMemoryDetailCache::new();
        assert!(cache.get(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache = InMemoryDetailCache::with_ttl(Duration::from_millis(10));
        let id = Uuid::now_v7();
        cache.set(&detail(id)).await.unwrap();
        assert!(cache.get(id).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get(id).await.unwrap().is_none());
    }
}
