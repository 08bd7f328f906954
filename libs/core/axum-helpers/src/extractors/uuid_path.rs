//! UUID path parameter extractor with automatic validation.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// Extractor for a single UUID path parameter.
///
/// Parses the path segment as a UUID and returns a structured 400 response
/// when it is not one, instead of axum's default plain-text rejection.
///
/// # Example
/// ```ignore
/// use axum_helpers::UuidPath;
///
/// async fn get_product(UuidPath(id): UuidPath) {
///     // id is a valid Uuid
/// }
/// ```
pub struct UuidPath(pub Uuid);

impl<S> FromRequestParts<S> for UuidPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        Uuid::parse_str(&raw)
            .map(UuidPath)
            .map_err(|_| AppError::BadRequest(format!("Invalid UUID: {}", raw)).into_response())
    }
}
