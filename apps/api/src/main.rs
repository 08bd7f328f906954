//! Catalog API - REST server

use axum::{Json, Router, routing::get};
use axum_helpers::shutdown_signal;
use domain_catalog::{PgCatalogStore, ProductAggregateService, RedisDetailCache, handlers};
use tracing::info;
use utoipa::OpenApi;

mod config;

use config::Config;

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();

    let config = Config::from_env()?;

    let db = database::postgres::connect_with_retry(&config.database_url, None).await?;
    database::postgres::run_migrations::<migration::Migrator>(&db).await?;

    let redis = database::redis::connect_with_retry(&config.redis_url, None).await?;

    let store = PgCatalogStore::new(db);
    let cache = RedisDetailCache::new(redis);
    let service = ProductAggregateService::new(store, cache);

    let app = Router::new()
        .nest("/api", handlers::router(service))
        .route("/health", get(health))
        .route("/openapi.json", get(openapi_spec));

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting Catalog API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Catalog API shutdown complete");
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(handlers::ApiDoc::openapi())
}
