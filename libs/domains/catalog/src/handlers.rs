use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{ErrorResponse, UuidPath, ValidatedJson};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::cache::DetailCache;
use crate::error::CatalogResult;
use crate::models::{
    AdjustInventory, CreateProduct, CreateVariant, InventoryLevel, ListProducts, Paged,
    ProductDetail, ProductSummary, UpdateProduct, UpdateVariant, VariantDetail,
};
use crate::service::ProductAggregateService;
use crate::store::{AggregateStore, InventoryLedger};

const TAG: &str = "products";

/// OpenAPI documentation for the catalog API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_product,
        update_product,
        delete_product,
        adjust_inventory,
    ),
    components(schemas(
        Paged<ProductSummary>,
        ProductDetail,
        VariantDetail,
        ProductSummary,
        CreateProduct,
        CreateVariant,
        UpdateProduct,
        UpdateVariant,
        AdjustInventory,
        InventoryLevel,
        ErrorResponse,
    )),
    tags(
        (name = TAG, description = "Product catalog endpoints")
    )
)]
pub struct ApiDoc;

/// Create the catalog router with all HTTP endpoints
pub fn router<S, C>(service: ProductAggregateService<S, C>) -> Router
where
    S: AggregateStore + InventoryLedger + 'static,
    C: DetailCache + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/variants/{id}/adjust-inventory", post(adjust_inventory))
        .with_state(shared_service)
}

/// List product summaries with optional filters
#[utoipa::path(
    get,
    path = "/products",
    tag = TAG,
    params(ListProducts),
    responses(
        (status = 200, description = "Page of product summaries", body = Paged<ProductSummary>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn list_products<S, C>(
    State(service): State<Arc<ProductAggregateService<S, C>>>,
    Query(params): Query<ListProducts>,
) -> CatalogResult<Json<Paged<ProductSummary>>>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    let page = service.list_products(params).await?;
    Ok(Json(page))
}

/// Create a product aggregate
#[utoipa::path(
    post,
    path = "/products",
    tag = TAG,
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = ProductDetail),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Duplicate slug or SKU", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn create_product<S, C>(
    State(service): State<Arc<ProductAggregateService<S, C>>>,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> CatalogResult<impl IntoResponse>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    let detail = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Get a product's detail view
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product detail", body = ProductDetail),
        (status = 400, description = "Invalid UUID", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn get_product<S, C>(
    State(service): State<Arc<ProductAggregateService<S, C>>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<ProductDetail>>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    let detail = service.get_detail(id).await?;
    Ok(Json(detail))
}

/// Update a product aggregate
#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated", body = ProductDetail),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Version token mismatch", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn update_product<S, C>(
    State(service): State<Arc<ProductAggregateService<S, C>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> CatalogResult<Json<ProductDetail>>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    let detail = service.update_product(id, input).await?;
    Ok(Json(detail))
}

/// Delete a product aggregate
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 400, description = "Invalid UUID", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn delete_product<S, C>(
    State(service): State<Arc<ProductAggregateService<S, C>>>,
    UuidPath(id): UuidPath,
) -> CatalogResult<impl IntoResponse>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    service.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Adjust a variant's inventory by a signed delta
#[utoipa::path(
    post,
    path = "/variants/{id}/adjust-inventory",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Variant ID")
    ),
    request_body = AdjustInventory,
    responses(
        (status = 200, description = "Inventory adjusted", body = InventoryLevel),
        (status = 400, description = "Zero delta or insufficient stock", body = ErrorResponse),
        (status = 404, description = "Inventory not tracked for variant", body = ErrorResponse),
        (status = 409, description = "Version token mismatch", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn adjust_inventory<S, C>(
    State(service): State<Arc<ProductAggregateService<S, C>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AdjustInventory>,
) -> CatalogResult<Json<InventoryLevel>>
where
    S: AggregateStore + InventoryLedger,
    C: DetailCache,
{
    let level = service.adjust_inventory(id, input).await?;
    Ok(Json(level))
}
