//! Postgres implementation of the aggregate store and inventory ledger.
//!
//! Every version guard is expressed as a filtered `UPDATE ... WHERE
//! version_token = $expected`; zero affected rows means another writer got
//! there first and the surrounding transaction rolls back untouched.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Condition, Expr, extension::postgres::PgExpr};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entity::{brand, category, inventory, product, product_image, product_variant};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{ListProducts, Paged, ProductSummary};
use crate::store::{
    AggregateStore, AggregateUpdate, InventoryAdjusted, InventoryLedger, NewAggregate,
    ProductAggregate, duplicate_sku,
};
use crate::version::VersionToken;

#[derive(Clone)]
pub struct PgCatalogStore {
    db: DatabaseConnection,
}

impl PgCatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn insert_images(
        txn: &DatabaseTransaction,
        product_id: Uuid,
        urls: &[String],
    ) -> CatalogResult<()> {
        if urls.is_empty() {
            return Ok(());
        }
        let rows = urls.iter().enumerate().map(|(position, url)| {
            product_image::ActiveModel {
                id: Set(Uuid::now_v7()),
                product_id: Set(product_id),
                image_url: Set(url.clone()),
                is_primary: Set(false),
                sort_order: Set(position as i32),
            }
        });
        product_image::Entity::insert_many(rows).exec(txn).await?;
        Ok(())
    }

    async fn insert_inventory(
        txn: &DatabaseTransaction,
        variant_id: Uuid,
        quantity: i32,
    ) -> CatalogResult<()> {
        inventory::ActiveModel {
            id: Set(Uuid::now_v7()),
            product_variant_id: Set(variant_id),
            quantity: Set(quantity),
            reserved: Set(0),
            updated_at: Set(Utc::now().into()),
            version_token: Set(VersionToken::fresh().as_uuid()),
        }
        .insert(txn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AggregateStore for PgCatalogStore {
    async fn load(&self, product_id: Uuid) -> CatalogResult<ProductAggregate> {
        // One repeatable-read snapshot; a concurrent writer must never leave
        // the aggregate reads half old, half new.
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await?;

        let product = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or(CatalogError::not_found("product", product_id))?;

        let category_name = category::Entity::find_by_id(product.category_id)
            .one(&txn)
            .await?
            .map(|c| c.name)
            .ok_or_else(|| CatalogError::Internal("category row missing".to_string()))?;

        let brand_name = match product.brand_id {
            Some(brand_id) => brand::Entity::find_by_id(brand_id)
                .one(&txn)
                .await?
                .map(|b| b.name),
            None => None,
        };

        let images = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .order_by_asc(product_image::Column::SortOrder)
            .all(&txn)
            .await?;

        let variants = product_variant::Entity::find()
            .find_also_related(inventory::Entity)
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::CreatedAt)
            .order_by_asc(product_variant::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await?;

        Ok(ProductAggregate {
            product,
            category_name,
            brand_name,
            images,
            variants,
        })
    }

    async fn create(&self, new: NewAggregate) -> CatalogResult<Uuid> {
        let skus: Vec<&str> = new.variants.iter().map(|v| v.sku.as_str()).collect();
        if let Some(sku) = duplicate_sku(&skus) {
            return Err(CatalogError::DuplicateSku(sku));
        }

        let txn = self.db.begin().await?;

        let slug_taken = product::Entity::find()
            .filter(product::Column::Slug.eq(&new.slug))
            .one(&txn)
            .await?
            .is_some();
        if slug_taken {
            return Err(CatalogError::DuplicateSlug(new.slug));
        }

        let now = Utc::now();
        let product_id = Uuid::now_v7();

        product::ActiveModel {
            id: Set(product_id),
            name: Set(new.name),
            slug: Set(new.slug),
            description: Set(new.description),
            category_id: Set(new.category_id),
            brand_id: Set(new.brand_id),
            base_price_cents: Set(new.base_price_cents),
            is_published: Set(new.is_published),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            version_token: Set(VersionToken::fresh().as_uuid()),
        }
        .insert(&txn)
        .await?;

        Self::insert_images(&txn, product_id, &new.image_urls).await?;

        for draft in new.variants {
            let variant_id = Uuid::now_v7();
            product_variant::ActiveModel {
                id: Set(variant_id),
                product_id: Set(product_id),
                sku: Set(draft.sku),
                color: Set(draft.color),
                size: Set(draft.size),
                additional_price_cents: Set(draft.additional_price_cents),
                is_active: Set(true),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                version_token: Set(VersionToken::fresh().as_uuid()),
            }
            .insert(&txn)
            .await?;

            if draft.initial_quantity > 0 {
                Self::insert_inventory(&txn, variant_id, draft.initial_quantity).await?;
            }
        }

        txn.commit().await?;
        tracing::info!(product_id = %product_id, "Created product aggregate");
        Ok(product_id)
    }

    async fn update(&self, product_id: Uuid, update: AggregateUpdate) -> CatalogResult<()> {
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

        let txn = self.db.begin().await?;

        product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or(CatalogError::not_found("product", product_id))?;

        if !update.plan.stray_ids.is_empty() {
            let foreign = product_variant::Entity::find()
                .filter(product_variant::Column::Id.is_in(update.plan.stray_ids.clone()))
                .one(&txn)
                .await?;
            if let Some(variant) = foreign {
                return Err(CatalogError::InvalidOperation(format!(
                    "variant {} belongs to a different product",
                    variant.id
                )));
            }
        }

        let now = Utc::now();

        let guarded = product::Entity::update_many()
            .set(product::ActiveModel {
                name: Set(update.name),
                description: Set(update.description),
                category_id: Set(update.category_id),
                brand_id: Set(update.brand_id),
                base_price_cents: Set(update.base_price_cents),
                is_published: Set(update.is_published),
                updated_at: Set(now.into()),
                version_token: Set(VersionToken::fresh().as_uuid()),
                ..Default::default()
            })
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::VersionToken.eq(update.expected_token.as_uuid()))
            .exec(&txn)
            .await?;
        if guarded.rows_affected == 0 {
            return Err(CatalogError::ConcurrencyConflict("product"));
        }

        product_image::Entity::delete_many()
            .filter(product_image::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        Self::insert_images(&txn, product_id, &update.image_urls).await?;

        // Deletions go first so a new variant can reuse a removed variant's
        // SKU without tripping UNIQUE(product_id, sku) mid-transaction.
        // Inventory rows go with their variants (ON DELETE CASCADE).
        if !update.plan.delete_ids.is_empty() {
            product_variant::Entity::delete_many()
                .filter(product_variant::Column::Id.is_in(update.plan.delete_ids.clone()))
                .filter(product_variant::Column::ProductId.eq(product_id))
                .exec(&txn)
                .await?;
        }

        for entry in &update.plan.updates {
            let mut guard = product_variant::Entity::update_many()
                .set(product_variant::ActiveModel {
                    sku: Set(entry.sku.clone()),
                    color: Set(entry.color.clone()),
                    size: Set(entry.size.clone()),
                    additional_price_cents: Set(entry.additional_price_cents),
                    is_active: Set(entry.is_active),
                    updated_at: Set(now.into()),
                    version_token: Set(VersionToken::fresh().as_uuid()),
                    ..Default::default()
                })
                .filter(product_variant::Column::Id.eq(entry.id))
                .filter(product_variant::Column::ProductId.eq(product_id));
            if let Some(expected) = entry.expected_token {
                guard = guard
                    .filter(product_variant::Column::VersionToken.eq(expected.as_uuid()));
            }
            let result = guard.exec(&txn).await?;
            if result.rows_affected == 0 {
                return Err(CatalogError::ConcurrencyConflict("variant"));
            }

            if entry.create_inventory {
                Self::insert_inventory(&txn, entry.id, entry.quantity).await?;
            } else {
                let result = inventory::Entity::update_many()
                    .set(inventory::ActiveModel {
                        quantity: Set(entry.quantity),
                        updated_at: Set(now.into()),
                        version_token: Set(VersionToken::fresh().as_uuid()),
                        ..Default::default()
                    })
                    .filter(inventory::Column::ProductVariantId.eq(entry.id))
                    .exec(&txn)
                    .await?;
                // Row existed when the plan was computed; recreate it if it
                // vanished in the meantime
                if result.rows_affected == 0 {
                    Self::insert_inventory(&txn, entry.id, entry.quantity).await?;
                }
            }
        }

        for draft in &update.plan.creates {
            let variant_id = Uuid::now_v7();
            product_variant::ActiveModel {
                id: Set(variant_id),
                product_id: Set(product_id),
                sku: Set(draft.sku.clone()),
                color: Set(draft.color.clone()),
                size: Set(draft.size.clone()),
                additional_price_cents: Set(draft.additional_price_cents),
                is_active: Set(draft.is_active),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                version_token: Set(VersionToken::fresh().as_uuid()),
            }
            .insert(&txn)
            .await?;
            Self::insert_inventory(&txn, variant_id, draft.quantity).await?;
        }

        txn.commit().await?;
        tracing::info!(product_id = %product_id, "Updated product aggregate");
        Ok(())
    }

    async fn delete(&self, product_id: Uuid) -> CatalogResult<()> {
        let result = product::Entity::delete_by_id(product_id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(CatalogError::not_found("product", product_id));
        }

        tracing::info!(product_id = %product_id, "Deleted product aggregate");
        Ok(())
    }

    async fn list(&self, params: ListProducts) -> CatalogResult<Paged<ProductSummary>> {
        let params = params.normalized();

        let mut query = product::Entity::find();

        if let Some(category_id) = params.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(brand_id) = params.brand_id {
            query = query.filter(product::Column::BrandId.eq(brand_id));
        }
        if let Some(keyword) = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", keyword);
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::col((product::Entity, product::Column::Name))
                            .ilike(pattern.clone()),
                    )
                    .add(Expr::col((product::Entity, product::Column::Slug)).ilike(pattern)),
            );
        }

        let total_items = query.clone().count(&self.db).await?;

        let products = query
            .order_by_desc(product::Column::CreatedAt)
            .offset((params.page - 1) * params.page_size)
            .limit(params.page_size)
            .all(&self.db)
            .await?;

        let category_ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
        let brand_ids: Vec<Uuid> = products.iter().filter_map(|p| p.brand_id).collect();

        let category_names: HashMap<Uuid, String> = category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let brand_names: HashMap<Uuid, String> = brand::Entity::find()
            .filter(brand::Column::Id.is_in(brand_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();

        let items = products
            .into_iter()
            .map(|p| ProductSummary {
                id: p.id,
                name: p.name,
                slug: p.slug,
                base_price_cents: p.base_price_cents,
                is_published: p.is_published,
                category_name: category_names.get(&p.category_id).cloned().unwrap_or_default(),
                brand_name: p.brand_id.and_then(|id| brand_names.get(&id).cloned()),
            })
            .collect();

        Ok(Paged::new(items, params.page, params.page_size, total_items))
    }

    async fn category_exists(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(category::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn brand_exists(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(brand::Entity::find_by_id(id).one(&self.db).await?.is_some())
    }
}

#[async_trait]
impl InventoryLedger for PgCatalogStore {
    async fn adjust(
        &self,
        variant_id: Uuid,
        delta: i32,
        expected_token: VersionToken,
    ) -> CatalogResult<InventoryAdjusted> {
        let txn = self.db.begin().await?;

        let inv = inventory::Entity::find()
            .filter(inventory::Column::ProductVariantId.eq(variant_id))
            .one(&txn)
            .await?
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

        let token = VersionToken::fresh();
        let result = inventory::Entity::update_many()
            .set(inventory::ActiveModel {
                quantity: Set(new_quantity),
                updated_at: Set(Utc::now().into()),
                version_token: Set(token.as_uuid()),
                ..Default::default()
            })
            .filter(inventory::Column::Id.eq(inv.id))
            .filter(inventory::Column::VersionToken.eq(expected_token.as_uuid()))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(CatalogError::ConcurrencyConflict("inventory"));
        }

        let product_id = product_variant::Entity::find_by_id(variant_id)
            .one(&txn)
            .await?
            .map(|v| v.product_id)
            .ok_or_else(|| CatalogError::Internal("variant row missing".to_string()))?;

        txn.commit().await?;
        tracing::info!(variant_id = %variant_id, delta, new_quantity, "Adjusted inventory");
        Ok(InventoryAdjusted {
            product_id,
            quantity: new_quantity,
            version_token: token,
        })
    }
}
