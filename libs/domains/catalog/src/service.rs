use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::cache::DetailCache;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    AdjustInventory, CreateProduct, InventoryLevel, ListProducts, Paged, ProductDetail,
    ProductSummary, UpdateProduct, clean_image_urls, slugify,
};
use crate::reconciler::reconcile;
use crate::store::{AggregateStore, AggregateUpdate, InventoryLedger, NewAggregate, NewVariant};

/// Service layer for Product aggregate business logic.
///
/// Mutations follow a fixed sequence: validate, apply through the store in
/// one transaction, invalidate the cached detail, then re-read so the
/// response carries the fresh version tokens. Cache failures are logged and
/// swallowed; the store remains the source of truth.
#[derive(Clone)]
pub struct ProductAggregateService<S, C>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    store: Arc<S>,
    cache: Arc<C>,
}

impl<S, C> ProductAggregateService<S, C>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    pub fn new(store: S, cache: C) -> Self {
        Self {
            store: Arc::new(store),
            cache: Arc::new(cache),
        }
    }

    /// Create a product aggregate and return its assembled detail view.
    pub async fn create_product(&self, input: CreateProduct) -> CatalogResult<ProductDetail> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        self.check_references(input.category_id, input.brand_id)
            .await?;

        let slug = match input.slug {
            Some(slug) => slug,
            None => slugify(&input.name),
        };

        let new = NewAggregate {
            name: input.name,
            slug,
            description: input.description,
            category_id: input.category_id,
            brand_id: input.brand_id,
            base_price_cents: input.base_price_cents,
            is_published: input.is_published,
            image_urls: clean_image_urls(&input.image_urls),
            variants: input
                .variants
                .into_iter()
                .map(|v| NewVariant {
                    sku: v.sku,
                    color: v.color,
                    size: v.size,
                    additional_price_cents: v.additional_price_cents,
                    initial_quantity: v.initial_quantity,
                })
                .collect(),
        };

        let product_id = self.store.create(new).await?;

        let detail = self.store.load(product_id).await?.to_detail();
        self.cache_detail(&detail).await;
        Ok(detail)
    }

    /// Fetch the detail view, reading through the cache.
    pub async fn get_detail(&self, product_id: Uuid) -> CatalogResult<ProductDetail> {
        match self.cache.get(product_id).await {
            Ok(Some(detail)) => return Ok(detail),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(product_id = %product_id, error = %err, "Cache read failed; falling back to store");
            }
        }

        let detail = self.store.load(product_id).await?.to_detail();
        self.cache_detail(&detail).await;
        Ok(detail)
    }

    /// List product summaries. Always reads the store; list results are
    /// never cached.
    pub async fn list_products(
        &self,
        params: ListProducts,
    ) -> CatalogResult<Paged<ProductSummary>> {
        self.store.list(params).await
    }

    /// Update a product aggregate: reconcile the requested variant list
    /// against persisted state and apply the whole mutation atomically.
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProduct,
    ) -> CatalogResult<ProductDetail> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        self.check_references(input.category_id, input.brand_id)
            .await?;

        let aggregate = self.store.load(product_id).await?;
        let plan = reconcile(&aggregate.variants, &input.variants);

        self.store
            .update(
                product_id,
                AggregateUpdate {
                    name: input.name,
                    description: input.description,
                    category_id: input.category_id,
                    brand_id: input.brand_id,
                    base_price_cents: input.base_price_cents,
                    is_published: input.is_published,
                    image_urls: clean_image_urls(&input.image_urls),
                    plan,
                    expected_token: input.expected_token,
                },
            )
            .await?;

        self.drop_cached(product_id).await;

        let detail = self.store.load(product_id).await?.to_detail();
        self.cache_detail(&detail).await;
        Ok(detail)
    }

    /// Delete a product aggregate and everything it owns.
    pub async fn delete_product(&self, product_id: Uuid) -> CatalogResult<()> {
        self.store.delete(product_id).await?;
        self.drop_cached(product_id).await;
        Ok(())
    }

    /// Apply a signed quantity delta to a variant's inventory.
    pub async fn adjust_inventory(
        &self,
        variant_id: Uuid,
        input: AdjustInventory,
    ) -> CatalogResult<InventoryLevel> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let adjusted = self
            .store
            .adjust(variant_id, input.delta, input.expected_token)
            .await?;

        // The cached detail embeds the old quantity and inventory token
        self.drop_cached(adjusted.product_id).await;

        Ok(InventoryLevel {
            product_id: adjusted.product_id,
            variant_id,
            quantity: adjusted.quantity,
            version_token: adjusted.version_token,
        })
    }

    async fn check_references(
        &self,
        category_id: Uuid,
        brand_id: Option<Uuid>,
    ) -> CatalogResult<()> {
        if !self.store.category_exists(category_id).await? {
            return Err(CatalogError::InvalidOperation(format!(
                "category {} does not exist",
                category_id
            )));
        }
        if let Some(brand_id) = brand_id {
            if !self.store.brand_exists(brand_id).await? {
                return Err(CatalogError::InvalidOperation(format!(
                    "brand {} does not exist",
                    brand_id
                )));
            }
        }
        Ok(())
    }

    async fn cache_detail(&self, detail: &ProductDetail) {
        if let Err(err) = self.cache.set(detail).await {
            tracing::warn!(product_id = %detail.id, error = %err, "Failed to cache product detail");
        }
    }

    async fn drop_cached(&self, product_id: Uuid) {
        if let Err(err) = self.cache.invalidate(product_id).await {
            tracing::warn!(product_id = %product_id, error = %err, "Failed to invalidate cached detail");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockDetailCache;
    use crate::models::CreateVariant;
    use crate::store::InMemoryCatalogStore;

    fn create_command(category_id: Uuid) -> CreateProduct {
        CreateProduct {
            name: "Trail Shirt".to_string(),
            slug: None,
            description: None,
            category_id,
            brand_id: None,
            base_price_cents: 2500,
            is_published: true,
            image_urls: vec![],
            variants: vec![CreateVariant {
                sku: "TS-M".to_string(),
                color: None,
                size: Some("M".to_string()),
                additional_price_cents: 0,
                initial_quantity: 5,
            }],
        }
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_fail_create() {
        let store = InMemoryCatalogStore::new();
        let category_id = store.seed_category("Apparel").await;

        let mut cache = MockDetailCache::new();
        cache
            .expect_set()
            .returning(|_| Err(CatalogError::Cache("redis down".to_string())));

        let service = ProductAggregateService::new(store, cache);
        let detail = service.create_product(create_command(category_id)).await.unwrap();

        assert_eq!(detail.slug, "trail-shirt");
        assert_eq!(detail.variants.len(), 1);
    }

    #[tokio::test]
    async fn cache_read_failure_falls_back_to_store() {
        let store = InMemoryCatalogStore::new();
        let category_id = store.seed_category("Apparel").await;

        let mut cache = MockDetailCache::new();
        cache
            .expect_set()
            .returning(|_| Err(CatalogError::Cache("redis down".to_string())));
        cache
            .expect_get()
            .returning(|_| Err(CatalogError::Cache("redis down".to_string())));

        let service = ProductAggregateService::new(store, cache);
        let created = service.create_product(create_command(category_id)).await.unwrap();

        let detail = service.get_detail(created.id).await.unwrap();
        assert_eq!(detail.id, created.id);
    }

    #[tokio::test]
    async fn cache_invalidation_failure_does_not_fail_delete() {
        let store = InMemoryCatalogStore::new();
        let category_id = store.seed_category("Apparel").await;

        let mut cache = MockDetailCache::new();
        cache.expect_set().returning(|_| Ok(()));
        cache
            .expect_invalidate()
            .returning(|_| Err(CatalogError::Cache("redis down".to_string())));

        let service = ProductAggregateService::new(store, cache);
        let created = service.create_product(create_command(category_id)).await.unwrap();

        service.delete_product(created.id).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let store = InMemoryCatalogStore::new();
        let cache = MockDetailCache::new();
        let service = ProductAggregateService::new(store, cache);

        let err = service
            .create_product(create_command(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidOperation(_)));
    }
}
