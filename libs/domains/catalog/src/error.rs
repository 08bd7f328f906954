use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0} was modified concurrently; reload and retry")]
    ConcurrencyConflict(&'static str),

    #[error("product with slug '{0}' already exists")]
    DuplicateSlug(String),

    #[error("variant with SKU '{0}' already exists for this product")]
    DuplicateSku(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        CatalogError::NotFound { entity, id }
    }
}

/// Map store errors onto the domain taxonomy.
///
/// Connection-level failures become `StorageUnavailable` so callers can
/// retry with backoff; they are never masked as `NotFound` or
/// `ConcurrencyConflict`. Unique-constraint violations become the matching
/// `Duplicate*` conflict.
impl From<DbErr> for CatalogError {
    fn from(err: DbErr) -> Self {
        if let Some(sql_err) = err.sql_err() {
            match sql_err {
                SqlErr::UniqueConstraintViolation(msg) => {
                    return if msg.contains("slug") {
                        CatalogError::DuplicateSlug(msg)
                    } else {
                        CatalogError::DuplicateSku(msg)
                    };
                }
                SqlErr::ForeignKeyConstraintViolation(msg) => {
                    return CatalogError::InvalidOperation(msg);
                }
                _ => {}
            }
        }

        match err {
            DbErr::Conn(e) => CatalogError::StorageUnavailable(e.to_string()),
            DbErr::ConnectionAcquire(e) => CatalogError::StorageUnavailable(e.to_string()),
            other => CatalogError::Internal(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for CatalogError {
    fn from(err: redis::RedisError) -> Self {
        CatalogError::Cache(err.to_string())
    }
}

/// Convert CatalogError to AppError for standardized error responses.
impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { entity, id } => {
                AppError::NotFound(format!("{} {} not found", entity, id))
            }
            CatalogError::ConcurrencyConflict(entity) => AppError::Conflict(format!(
                "{} was modified concurrently; reload and retry",
                entity
            )),
            CatalogError::DuplicateSlug(slug) => {
                AppError::Conflict(format!("Product with slug '{}' already exists", slug))
            }
            CatalogError::DuplicateSku(sku) => {
                AppError::Conflict(format!("Variant with SKU '{}' already exists", sku))
            }
            CatalogError::InvalidOperation(msg) => AppError::BadRequest(msg),
            CatalogError::InsufficientStock {
                available,
                requested,
            } => AppError::BadRequest(format!(
                "Insufficient stock: {} available, {} requested",
                available, requested
            )),
            CatalogError::Validation(msg) => AppError::BadRequest(msg),
            CatalogError::StorageUnavailable(msg) => AppError::ServiceUnavailable(msg),
            CatalogError::Cache(msg) => AppError::InternalServerError(msg),
            CatalogError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn concurrency_conflict_maps_to_409() {
        let response = CatalogError::ConcurrencyConflict("product").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn insufficient_stock_maps_to_400() {
        let err = CatalogError::InsufficientStock {
            available: 5,
            requested: 6,
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_unavailable_maps_to_503() {
        let response = CatalogError::StorageUnavailable("pool timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
