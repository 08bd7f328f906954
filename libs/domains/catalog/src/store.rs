//! Aggregate persistence: trait definitions and the in-memory
//! implementation used by tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entity::{inventory, product, product_image, product_variant};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{ListProducts, Paged, ProductDetail, ProductSummary, VariantDetail};
use crate::reconciler::VariantPlan;
use crate::version::VersionToken;

/// The full Product aggregate as loaded from the store: the product row,
/// resolved reference names, ordered images, and variants paired with their
/// optional inventory rows — one consistency boundary.
#[derive(Debug, Clone)]
pub struct ProductAggregate {
    pub product: product::Model,
    pub category_name: String,
    pub brand_name: Option<String>,
    pub images: Vec<product_image::Model>,
    pub variants: Vec<(product_variant::Model, Option<inventory::Model>)>,
}

impl ProductAggregate {
    /// Assemble the client-facing detail view. Every field is copied
    /// explicitly; nothing is derived implicitly from the entities.
    pub fn to_detail(&self) -> ProductDetail {
        ProductDetail {
            id: self.product.id,
            name: self.product.name.clone(),
            slug: self.product.slug.clone(),
            description: self.product.description.clone(),
            base_price_cents: self.product.base_price_cents,
            is_published: self.product.is_published,
            category_name: self.category_name.clone(),
            brand_name: self.brand_name.clone(),
            image_urls: self.images.iter().map(|i| i.image_url.clone()).collect(),
            variants: self
                .variants
                .iter()
                .map(|(variant, inv)| VariantDetail {
                    id: variant.id,
                    sku: variant.sku.clone(),
                    color: variant.color.clone(),
                    size: variant.size.clone(),
                    effective_price_cents: self.product.base_price_cents
                        + variant.additional_price_cents,
                    is_active: variant.is_active,
                    quantity: inv.as_ref().map(|i| i.quantity).unwrap_or(0),
                    version_token: VersionToken::from(variant.version_token),
                    inventory_version_token: inv
                        .as_ref()
                        .map(|i| VersionToken::from(i.version_token)),
                })
                .collect(),
            version_token: VersionToken::from(self.product.version_token),
        }
    }
}

/// Draft of a new aggregate, built field-by-field by the service from a
/// validated create command. Ids, tokens, and timestamps are assigned by
/// the store at insert time.
#[derive(Debug, Clone)]
pub struct NewAggregate {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub base_price_cents: i64,
    pub is_published: bool,
    /// Already deduplicated and cleaned; positions become sort order
    pub image_urls: Vec<String>,
    pub variants: Vec<NewVariant>,
}

#[derive(Debug, Clone)]
pub struct NewVariant {
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub additional_price_cents: i64,
    pub initial_quantity: i32,
}

/// Mutation of an existing aggregate: new product field values, the
/// replacement image list, and the reconciled variant plan, all guarded by
/// the product's expected version token.
#[derive(Debug, Clone)]
pub struct AggregateUpdate {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub base_price_cents: i64,
    pub is_published: bool,
    pub image_urls: Vec<String>,
    pub plan: VariantPlan,
    pub expected_token: VersionToken,
}

/// Outcome of a successful inventory adjustment; the owning product id
/// drives cache invalidation.
#[derive(Debug, Clone, Copy)]
pub struct InventoryAdjusted {
    pub product_id: Uuid,
    pub quantity: i32,
    pub version_token: VersionToken,
}

/// Persistence boundary for the Product aggregate.
///
/// Every multi-row write happens inside one atomic unit: either every row
/// change commits, or none does. Version-guarded writes fail with
/// `ConcurrencyConflict` and leave no partial state behind.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Load the full aggregate with reference names and all version tokens.
    async fn load(&self, product_id: Uuid) -> CatalogResult<ProductAggregate>;

    /// Insert product, images, variants, and initial inventory atomically.
    async fn create(&self, new: NewAggregate) -> CatalogResult<Uuid>;

    /// Persist product changes, replace the image set, and apply the
    /// variant plan, each guarded by its expected token.
    async fn update(&self, product_id: Uuid, update: AggregateUpdate) -> CatalogResult<()>;

    /// Remove the product, cascading to images, variants, and inventory.
    async fn delete(&self, product_id: Uuid) -> CatalogResult<()>;

    /// Paged summaries; reads through to storage, never cached.
    async fn list(&self, params: ListProducts) -> CatalogResult<Paged<ProductSummary>>;

    async fn category_exists(&self, id: Uuid) -> CatalogResult<bool>;

    async fn brand_exists(&self, id: Uuid) -> CatalogResult<bool>;
}

/// Inventory quantity adjustments, each in its own transaction independent
/// of any concurrent aggregate update.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Apply a signed delta to the variant's inventory row. Fails with
    /// `NotFound` for untracked inventory, `ConcurrencyConflict` on token
    /// mismatch, and insufficient stock when the delta would drive the
    /// quantity negative — in every failure case the quantity is untouched.
    async fn adjust(
        &self,
        variant_id: Uuid,
        delta: i32,
        expected_token: VersionToken,
    ) -> CatalogResult<InventoryAdjusted>;
}

/// In-memory implementation of the store and ledger (for tests).
///
/// Mirrors the relational semantics: version guards, slug/SKU uniqueness,
/// cascade deletes, and all-or-nothing mutations (checks happen before any
/// state is touched, under one write lock).
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    categories: HashMap<Uuid, String>,
    brands: HashMap<Uuid, String>,
    products: HashMap<Uuid, product::Model>,
    images: HashMap<Uuid, product_image::Model>,
    variants: HashMap<Uuid, product_variant::Model>,
    /// Keyed by variant id (1:1)
    inventories: HashMap<Uuid, inventory::Model>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reference category and return its id.
    pub async fn seed_category(&self, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.state
            .write()
            .await
            .categories
            .insert(id, name.to_string());
        id
    }

    /// Register a reference brand and return its id.
    pub async fn seed_brand(&self, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.state.write().await.brands.insert(id, name.to_string());
        id
    }
}

impl State {
    fn aggregate(&self, product_id: Uuid) -> CatalogResult<ProductAggregate> {
        let product = self
            .products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::not_found("product", product_id))?;

        let category_name = self
            .categories
            .get(&product.category_id)
            .cloned()
            .ok_or_else(|| CatalogError::Internal("category row missing".to_string()))?;

        let brand_name = product.brand_id.and_then(|id| self.brands.get(&id).cloned());

        let mut images: Vec<product_image::Model> = self
            .images
            .values()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect();
        images.sort_by_key(|i| i.sort_order);

        let mut variants: Vec<product_variant::Model> = self
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect();
        variants.sort_by_key(|v| (v.created_at, v.id));

        let variants = variants
            .into_iter()
            .map(|v| {
                let inv = self.inventories.get(&v.id).cloned();
                (v, inv)
            })
            .collect();

        Ok(ProductAggregate {
            product,
            category_name,
            brand_name,
            images,
            variants,
        })
    }

    fn replace_images(&mut self, product_id: Uuid, urls: &[String]) {
        self.images.retain(|_, i| i.product_id != product_id);
        for (position, url) in urls.iter().enumerate() {
            let image = product_image::Model {
                id: Uuid::now_v7(),
                product_id,
                image_url: url.clone(),
                is_primary: false,
                sort_order: position as i32,
            };
            self.images.insert(image.id, image);
        }
    }
}

pub(crate) fn duplicate_sku(skus: &[&str]) -> Option<String> {
    let mut seen = HashSet::new();
    skus.iter()
        .find(|sku| !seen.insert(**sku))
        .map(|sku| sku.to_string())
}

#[async_trait]
impl AggregateStore for InMemoryCatalogStore {
    async fn load(&self, product_id: Uuid) -> CatalogResult<ProductAggregate> {
        self.state.read().await.aggregate(product_id)
    }

    async fn create(&self, new: NewAggregate) -> CatalogResult<Uuid> {
        let mut state = self.state.write().await;

        if state.products.values().any(|p| p.slug == new.slug) {
            return Err(CatalogError::DuplicateSlug(new.slug));
        }
        let skus: Vec<&str> = new.variants.iter().map(|v| v.sku.as_str()).collect();
        if let Some(sku) = duplicate_sku(&skus) {
            return Err(CatalogError::DuplicateSku(sku));
        }

        let now = Utc::now().into();
        let product_id = Uuid::now_v7();

        state.products.insert(
            product_id,
            product::Model {
                id: product_id,
                name: new.name,
                slug: new.slug,
                description: new.description,
                category_id: new.category_id,
                brand_id: new.brand_id,
                base_price_cents: new.base_price_cents,
                is_published: new.is_published,
                created_at: now,
                updated_at: now,
                version_token: VersionToken::fresh().as_uuid(),
            },
        );

        state.replace_images(product_id, &new.image_urls);

        for draft in new.variants {
            let variant_id = Uuid::now_v7();
            state.variants.insert(
                variant_id,
                product_variant::Model {
                    id: variant_id,
                    product_id,
                    sku: draft.sku,
                    color: draft.color,
                    size: draft.size,
                    additional_price_cents: draft.additional_price_cents,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                    version_token: VersionToken::fresh().as_uuid(),
                },
            );
            if draft.initial_quantity > 0 {
                state.inventories.insert(
                    variant_id,
                    inventory::Model {
                        id: Uuid::now_v7(),
                        product_variant_id: variant_id,
                        quantity: draft.initial_quantity,
                        reserved: 0,
                        updated_at: now,
                        version_token: VersionToken::fresh().as_uuid(),
                    },
                );
            }
        }

        tracing::info!(product_id = %product_id, "Created product aggregate");
        Ok(product_id)
    }

    async fn update(&self, product_id: Uuid, update: AggregateUpdate) -> CatalogResult<()> {
        let mut state = self.state.write().await;

        // All guards run before any mutation so a failed update leaves
        // state byte-identical to before the call.
        let product = state
            .products
            .get(&product_id)
            .ok_or(CatalogError::not_found("product", product_id))?;

        if product.version_token != update.expected_token.as_uuid() {
            return Err(CatalogError::ConcurrencyConflict("product"));
        }

        for stray in &update.plan.stray_ids {
            if state.variants.contains_key(stray) {
                return Err(CatalogError::InvalidOperation(format!(
                    "variant {} belongs to a different product",
                    stray
                )));
            }
        }

        for entry in &update.plan.updates {
            let variant = state
                .variants
                .get(&entry.id)
                .ok_or(CatalogError::ConcurrencyConflict("variant"))?;
            if let Some(expected) = entry.expected_token {
                if variant.version_token != expected.as_uuid() {
                    return Err(CatalogError::ConcurrencyConflict("variant"));
                }
            }
        }

        if !update.plan.is_empty() {
            let skus: Vec<&str> = update
                .plan
                .updates
                .iter()
                .map(|u| u.sku.as_str())
                .chain(update.plan.creates.iter().map(|c| c.sku.as_str()))
                .collect();
            if let Some(sku) = duplicate_sku(&skus) {
                return Err(CatalogError::DuplicateSku(sku));
            }
        }

        let now = Utc::now().into();

        let product = state.products.get_mut(&product_id).unwrap();
        product.name = update.name;
        product.description = update.description;
        product.category_id = update.category_id;
        product.brand_id = update.brand_id;
        product.base_price_cents = update.base_price_cents;
        product.is_published = update.is_published;
        product.updated_at = now;
        product.version_token = VersionToken::fresh().as_uuid();

        state.replace_images(product_id, &update.image_urls);

        for entry in &update.plan.updates {
            let variant = state.variants.get_mut(&entry.id).unwrap();
            variant.sku = entry.sku.clone();
            variant.color = entry.color.clone();
            variant.size = entry.size.clone();
            variant.additional_price_cents = entry.additional_price_cents;
            variant.is_active = entry.is_active;
            variant.updated_at = now;
            variant.version_token = VersionToken::fresh().as_uuid();

            if entry.create_inventory {
                state.inventories.insert(
                    entry.id,
                    inventory::Model {
                        id: Uuid::now_v7(),
                        product_variant_id: entry.id,
                        quantity: entry.quantity,
                        reserved: 0,
                        updated_at: now,
                        version_token: VersionToken::fresh().as_uuid(),
                    },
                );
            } else {
                let inv = state.inventories.get_mut(&entry.id).unwrap();
                inv.quantity = entry.quantity;
                inv.updated_at = now;
                inv.version_token = VersionToken::fresh().as_uuid();
            }
        }

        for draft in &update.plan.creates {
            let variant_id = Uuid::now_v7();
            state.variants.insert(
                variant_id,
                product_variant::Model {
                    id: variant_id,
                    product_id,
                    sku: draft.sku.clone(),
                    color: draft.color.clone(),
                    size: draft.size.clone(),
                    additional_price_cents: draft.additional_price_cents,
                    is_active: draft.is_active,
                    created_at: now,
                    updated_at: now,
                    version_token: VersionToken::fresh().as_uuid(),
                },
            );
            state.inventories.insert(
                variant_id,
                inventory::Model {
                    id: Uuid::now_v7(),
                    product_variant_id: variant_id,
                    quantity: draft.quantity,
                    reserved: 0,
                    updated_at: now,
                    version_token: VersionToken::fresh().as_uuid(),
                },
            );
        }

        for id in &update.plan.delete_ids {
            state.variants.remove(id);
            state.inventories.remove(id);
        }

        tracing::info!(product_id = %product_id, "Updated product aggregate");
        Ok(())
    }

    async fn delete(&self, product_id: Uuid) -> CatalogResult<()> {
        let mut state = self.state.write().await;

        if state.products.remove(&product_id).is_none() {
            return Err(CatalogError::not_found("product", product_id));
        }

        state.images.retain(|_, i| i.product_id != product_id);
        let removed: Vec<Uuid> = state
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .map(|v| v.id)
            .collect();
        for id in removed {
            state.variants.remove(&id);
            state.inventories.remove(&id);
        }

        tracing::info!(product_id = %product_id, "Deleted product aggregate");
        Ok(())
    }

    async fn list(&self, params: ListProducts) -> CatalogResult<Paged<ProductSummary>> {
        let params = params.normalized();
        let state = self.state.read().await;

        let keyword = params
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut matches: Vec<&product::Model> = state
            .products
            .values()
            .filter(|p| params.category_id.is_none_or(|id| p.category_id == id))
            .filter(|p| params.brand_id.is_none_or(|id| p.brand_id == Some(id)))
            .filter(|p| {
                keyword.as_deref().is_none_or(|kw| {
                    p.name.to_lowercase().contains(kw) || p.slug.to_lowercase().contains(kw)
                })
            })
            .collect();

        let total_items = matches.len() as u64;
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let items = matches
            .into_iter()
            .skip(((params.page - 1) * params.page_size) as usize)
            .take(params.page_size as usize)
            .map(|p| ProductSummary {
                id: p.id,
                name: p.name.clone(),
                slug: p.slug.clone(),
                base_price_cents: p.base_price_cents,
                is_published: p.is_published,
                category_name: state
                    .categories
                    .get(&p.category_id)
                    .cloned()
                    .unwrap_or_default(),
                brand_name: p.brand_id.and_then(|id| state.brands.get(&id).cloned()),
            })
            .collect();

        Ok(Paged::new(items, params.page, params.page_size, total_items))
    }

    async fn category_exists(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.state.read().await.categories.contains_key(&id))
    }

    async fn brand_exists(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.state.read().await.brands.contains_key(&id))
    }
}

#[async_trait]
impl InventoryLedger for InMemoryCatalogStore {
    async fn adjust(
        &self,
        variant_id: Uuid,
        delta: i32,
        expected_token: VersionToken,
    ) -> CatalogResult<InventoryAdjusted> {
        let mut state = self.state.write().await;

        let inv = state
            .inventories
            .get(&variant_id)
            .ok_or(CatalogError::not_found("inventory", variant_id))?;

        if inv.version_token != expected_token.as_uuid() {
            return Err(CatalogError::ConcurrencyConflict("inventory"));
        }

        // Checked arithmetic: delta comes straight off the wire
        let new_quantity = inv.quantity.checked_add(delta).ok_or_else(|| {
            CatalogError::InvalidOperation("inventory adjustment overflows quantity".to_string())
        })?;
        if new_quantity < 0 {
            return Err(CatalogError::InsufficientStock {
                available: inv.quantity,
                requested: delta.checked_neg().unwrap_or(i32::MAX),
            });
        }

        let product_id = state
            .variants
            .get(&variant_id)
            .map(|v| v.product_id)
            .ok_or_else(|| CatalogError::Internal("variant row missing".to_string()))?;

        let token = VersionToken::fresh();
        let inv = state.inventories.get_mut(&variant_id).unwrap();
        inv.quantity = new_quantity;
        inv.updated_at = Utc::now().into();
        inv.version_token = token.as_uuid();

        tracing::info!(variant_id = %variant_id, delta, new_quantity, "Adjusted inventory");
        Ok(InventoryAdjusted {
            product_id,
            quantity: new_quantity,
            version_token: token,
        })
    }
}
