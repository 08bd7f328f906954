//! Catalog Domain
//!
//! Product aggregates (product, images, variants, inventory) with
//! optimistic concurrency and a read-through detail cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, reconciliation, cache coherence
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌─────────────┐
//! │    Store    │     │ DetailCache │  ← Postgres / Redis (traits +
//! └──────┬──────┘     └─────────────┘    in-memory implementations)
//!        │
//! ┌──────▼──────┐
//! │  Entities   │  ← sea-orm models
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_catalog::{
//!     cache::InMemoryDetailCache, handlers, service::ProductAggregateService,
//!     store::InMemoryCatalogStore,
//! };
//!
//! let store = InMemoryCatalogStore::new();
//! let cache = InMemoryDetailCache::new();
//! let service = ProductAggregateService::new(store, cache);
//!
//! let router = handlers::router(service);
//! ```

pub mod cache;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod reconciler;
pub mod service;
pub mod store;
pub mod version;

// Re-export commonly used types
pub use cache::{DetailCache, InMemoryDetailCache, RedisDetailCache};
pub use error::{CatalogError, CatalogResult};
pub use models::{
    AdjustInventory, CreateProduct, CreateVariant, InventoryLevel, ListProducts, Paged,
    ProductDetail, ProductSummary, UpdateProduct, UpdateVariant, VariantDetail,
};
pub use postgres::PgCatalogStore;
pub use reconciler::{VariantPlan, reconcile};
pub use service::ProductAggregateService;
pub use store::{AggregateStore, InMemoryCatalogStore, InventoryLedger};
pub use version::VersionToken;
