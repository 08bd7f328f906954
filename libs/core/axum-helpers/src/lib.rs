//! # Axum Helpers
//!
//! Shared HTTP plumbing for the catalog services:
//!
//! - **[`errors`]**: structured error responses with a single `AppError` type
//! - **[`extractors`]**: custom extractors (UUID path, validated JSON)
//! - **[`shutdown`]**: graceful-shutdown signal handling

pub mod errors;
pub mod extractors;
pub mod shutdown;

pub use errors::{AppError, ErrorResponse};
pub use extractors::{UuidPath, ValidatedJson};
pub use shutdown::shutdown_signal;
