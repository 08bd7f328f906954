//! Sea-ORM entities for the catalog tables.
//!
//! One module per table. The Product aggregate spans `product`,
//! `product_variant`, `product_image`, and `inventory`; `category` and
//! `brand` are shared reference data, never mutated here.

pub mod brand;
pub mod category;
pub mod inventory;
pub mod product;
pub mod product_image;
pub mod product_variant;
