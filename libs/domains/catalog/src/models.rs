use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::version::VersionToken;

/// Delta of zero is a no-op that must never reach the inventory ledger.
fn validate_nonzero_delta(delta: i32) -> Result<(), validator::ValidationError> {
    if delta == 0 {
        return Err(validator::ValidationError::new("zero_delta"));
    }
    Ok(())
}

/// Assembled product detail view.
///
/// This is the shape cached by the detail cache and returned by every
/// mutation; entries are immutable snapshots, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Base price in cents
    pub base_price_cents: i64,
    pub is_published: bool,
    pub category_name: String,
    pub brand_name: Option<String>,
    /// Image URLs in display order
    pub image_urls: Vec<String>,
    pub variants: Vec<VariantDetail>,
    /// Token to echo back in the next update request
    pub version_token: VersionToken,
}

/// Variant entry within a [`ProductDetail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VariantDetail {
    pub id: Uuid,
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    /// Base price plus the variant's additional price, in cents
    pub effective_price_cents: i64,
    pub is_active: bool,
    /// On-hand quantity; zero when the variant has no tracked inventory
    pub quantity: i32,
    pub version_token: VersionToken,
    /// Present only when the variant has a tracked inventory row;
    /// required for inventory adjustments
    pub inventory_version_token: Option<VersionToken>,
}

/// Product list entry (summary projection).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub base_price_cents: i64,
    pub is_published: bool,
    pub category_name: String,
    pub brand_name: Option<String>,
}

/// Page envelope for list queries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total_items: u64) -> Self {
        Self {
            items,
            page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size.max(1)),
        }
    }
}

/// Command: create a product aggregate.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Derived from the name when omitted
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub base_price_cents: i64,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub variants: Vec<CreateVariant>,
}

/// Variant entry within a [`CreateProduct`] command.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateVariant {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(max = 64))]
    pub color: Option<String>,
    #[validate(length(max = 64))]
    pub size: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub additional_price_cents: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub initial_quantity: i32,
}

/// Command: update a product aggregate.
///
/// The variant list is reconciled against persisted state: entries with a
/// known id update that variant, entries without one create a new variant,
/// and — when the list is non-empty — persisted variants absent from the
/// list are deleted. An empty list leaves the variant set untouched.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub base_price_cents: i64,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub variants: Vec<UpdateVariant>,
    /// Product token captured at read time
    pub expected_token: VersionToken,
}

/// Variant entry within an [`UpdateProduct`] command.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateVariant {
    /// Omitted for new variants
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(max = 64))]
    pub color: Option<String>,
    #[validate(length(max = 64))]
    pub size: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub additional_price_cents: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub quantity: i32,
    /// Variant token captured at read time; guards the update when supplied
    pub expected_token: Option<VersionToken>,
}

fn default_true() -> bool {
    true
}

/// Command: apply a signed quantity delta to a variant's inventory.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdjustInventory {
    #[validate(custom(function = "validate_nonzero_delta"))]
    pub delta: i32,
    /// Inventory token captured at read time
    pub expected_token: VersionToken,
}

/// Inventory level after a successful adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryLevel {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    /// Token to echo back in the next adjustment request
    pub version_token: VersionToken,
}

/// Query parameters for the product list.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct ListProducts {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub page_size: u64,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    /// Case-insensitive match against name and slug
    pub search: Option<String>,
}

impl ListProducts {
    /// Clamp out-of-range paging values to usable defaults.
    pub fn normalized(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        if self.page_size == 0 {
            self.page_size = 20;
        }
        self
    }
}

/// Derive a URL slug from a product name.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Deduplicate image URLs preserving order, dropping blank entries.
pub fn clean_image_urls(urls: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.iter()
        .filter(|url| !url.trim().is_empty())
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delta_fails_validation() {
        let cmd = AdjustInventory {
            delta: 0,
            expected_token: VersionToken::fresh(),
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn negative_delta_passes_validation() {
        let cmd = AdjustInventory {
            delta: -3,
            expected_token: VersionToken::fresh(),
        };
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Red Shirt XL"), "red-shirt-xl");
    }

    #[test]
    fn clean_image_urls_dedupes_and_skips_blanks() {
        let urls = vec![
            "https://img/a.png".to_string(),
            "  ".to_string(),
            "https://img/b.png".to_string(),
            "https://img/a.png".to_string(),
        ];
        assert_eq!(
            clean_image_urls(&urls),
            vec!["https://img/a.png".to_string(), "https://img/b.png".to_string()]
        );
    }

    #[test]
    fn list_params_clamp_to_defaults() {
        let params = ListProducts::default().normalized();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 20);
    }

    #[test]
    fn paged_computes_total_pages() {
        let paged: Paged<u32> = Paged::new(vec![], 1, 20, 41);
        assert_eq!(paged.total_pages, 3);
    }
}
