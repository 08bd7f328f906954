//! Variant reconciliation: diffing a requested variant list against
//! persisted state into an explicit create/update/delete plan.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::entity::{inventory, product_variant};
use crate::models::UpdateVariant;
use crate::version::VersionToken;

/// The mutation plan produced by [`reconcile`], applied by the store inside
/// the aggregate-update transaction.
#[derive(Debug, Clone, Default)]
pub struct VariantPlan {
    /// Matched entries: persisted variants to update in place
    pub updates: Vec<VariantUpdate>,
    /// Entries without a known id: fresh variants to insert
    pub creates: Vec<VariantCreate>,
    /// Persisted variants omitted from a non-empty request list
    pub delete_ids: Vec<Uuid>,
    /// Requested ids that matched nothing here; the store rejects any that
    /// exist under a different product before treating the entry as new
    pub stray_ids: Vec<Uuid>,
}

impl VariantPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.creates.is_empty() && self.delete_ids.is_empty()
    }
}

/// In-place update of one persisted variant.
#[derive(Debug, Clone)]
pub struct VariantUpdate {
    pub id: Uuid,
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub additional_price_cents: i64,
    pub is_active: bool,
    pub quantity: i32,
    /// Guards the variant row when supplied
    pub expected_token: Option<VersionToken>,
    /// The matched variant had no inventory row; create one instead of
    /// updating in place
    pub create_inventory: bool,
}

/// Insertion of a brand-new variant with a fresh inventory row.
#[derive(Debug, Clone)]
pub struct VariantCreate {
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub additional_price_cents: i64,
    pub is_active: bool,
    pub quantity: i32,
}

/// Compute the create/update/delete plan for a requested variant list.
///
/// Rules:
/// - entries whose id matches a persisted variant update it; duplicate ids
///   collapse to one update, last write wins;
/// - entries without an id, or with an id unknown here, create a new
///   variant (unknown ids are additionally reported as stray for the store
///   to vet against other products);
/// - persisted variants absent from a non-empty request list are deleted;
/// - an empty request list means "no change to variants" — never "delete
///   all". A malformed client payload must not silently wipe the set.
pub fn reconcile(
    persisted: &[(product_variant::Model, Option<inventory::Model>)],
    requested: &[UpdateVariant],
) -> VariantPlan {
    if requested.is_empty() {
        return VariantPlan::default();
    }

    let has_inventory: HashMap<Uuid, bool> = persisted
        .iter()
        .map(|(variant, inv)| (variant.id, inv.is_some()))
        .collect();

    let mut plan = VariantPlan::default();
    let mut matched: HashSet<Uuid> = HashSet::new();

    for entry in requested {
        match entry.id {
            Some(id) if has_inventory.contains_key(&id) => {
                let update = VariantUpdate {
                    id,
                    sku: entry.sku.clone(),
                    color: entry.color.clone(),
                    size: entry.size.clone(),
                    additional_price_cents: entry.additional_price_cents,
                    is_active: entry.is_active,
                    quantity: entry.quantity,
                    expected_token: entry.expected_token,
                    create_inventory: !has_inventory[&id],
                };
                if matched.insert(id) {
                    plan.updates.push(update);
                } else if let Some(existing) =
                    plan.updates.iter_mut().find(|u| u.id == id)
                {
                    // Duplicate id in the request: last write wins, still
                    // only one persisted row touched
                    *existing = update;
                }
            }
            other => {
                if let Some(stray) = other {
                    plan.stray_ids.push(stray);
                }
                plan.creates.push(VariantCreate {
                    sku: entry.sku.clone(),
                    color: entry.color.clone(),
                    size: entry.size.clone(),
                    additional_price_cents: entry.additional_price_cents,
                    is_active: entry.is_active,
                    quantity: entry.quantity,
                });
            }
        }
    }

    plan.delete_ids = persisted
        .iter()
        .map(|(variant, _)| variant.id)
        .filter(|id| !matched.contains(id))
        .collect();

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn persisted_variant(
        id: Uuid,
        sku: &str,
        with_inventory: bool,
    ) -> (product_variant::Model, Option<inventory::Model>) {
        let now = Utc::now().into();
        let variant = product_variant::Model {
            id,
            product_id: Uuid::now_v7(),
            sku: sku.to_string(),
            color: None,
            size: None,
            additional_price_cents: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            version_token: VersionToken::fresh().as_uuid(),
        };
        let inv = with_inventory.then(|| inventory::Model {
            id: Uuid::now_v7(),
            product_variant_id: id,
            quantity: 10,
            reserved: 0,
            updated_at: now,
            version_token: VersionToken::fresh().as_uuid(),
        });
        (variant, inv)
    }

    fn requested(id: Option<Uuid>, sku: &str, quantity: i32) -> UpdateVariant {
        UpdateVariant {
            id,
            sku: sku.to_string(),
            color: None,
            size: None,
            additional_price_cents: 0,
            is_active: true,
            quantity,
            expected_token: None,
        }
    }

    #[test]
    fn matched_new_and_removed_are_partitioned() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let persisted = vec![
            persisted_variant(a, "SKU-A", true),
            persisted_variant(b, "SKU-B", true),
        ];
        let request = vec![requested(Some(a), "SKU-A2", 5), requested(None, "SKU-NEW", 3)];

        let plan = reconcile(&persisted, &request);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, a);
        assert_eq!(plan.updates[0].sku, "SKU-A2");
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].sku, "SKU-NEW");
        assert_eq!(plan.delete_ids, vec![b]);
        assert!(plan.stray_ids.is_empty());
    }

    #[test]
    fn empty_request_list_deletes_nothing() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let persisted = vec![
            persisted_variant(a, "SKU-A", true),
            persisted_variant(b, "SKU-B", false),
        ];

        let plan = reconcile(&persisted, &[]);

        assert!(plan.is_empty());
        assert!(plan.delete_ids.is_empty());
    }

    #[test]
    fn matched_variant_without_inventory_gets_one_created() {
        let a = Uuid::now_v7();
        let persisted = vec![persisted_variant(a, "SKU-A", false)];
        let request = vec![requested(Some(a), "SKU-A", 7)];

        let plan = reconcile(&persisted, &request);

        assert!(plan.updates[0].create_inventory);
        assert_eq!(plan.updates[0].quantity, 7);
    }

    #[test]
    fn duplicate_ids_collapse_to_one_update_last_wins() {
        let a = Uuid::now_v7();
        let persisted = vec![persisted_variant(a, "SKU-A", true)];
        let request = vec![requested(Some(a), "FIRST", 1), requested(Some(a), "LAST", 2)];

        let plan = reconcile(&persisted, &request);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].sku, "LAST");
        assert_eq!(plan.updates[0].quantity, 2);
        assert!(plan.delete_ids.is_empty());
    }

    #[test]
    fn unknown_id_is_treated_as_new_and_reported_stray() {
        let stray = Uuid::now_v7();
        let a = Uuid::now_v7();
        let persisted = vec![persisted_variant(a, "SKU-A", true)];
        let request = vec![requested(Some(stray), "SKU-X", 4)];

        let plan = reconcile(&persisted, &request);

        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.stray_ids, vec![stray]);
        // SKU-A was omitted from a non-empty list, so it goes
        assert_eq!(plan.delete_ids, vec![a]);
    }
}
