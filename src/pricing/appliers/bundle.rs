// Bundle applier
//
// Bundles are all-or-nothing: every line of a complete bundle takes the
// discount, or none does.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{line_amount, synergy_allows, DiscountApplier};
use crate::pricing::{
    config_store::CategoryTree,
    input::{BasketItem, ItemKind, PricingInput},
    models::{excepted, included, Discount},
    types::{BundleId, DiscountType},
};

pub struct BundleApplier;

impl BundleApplier {
    fn bundle_eligible(discount: &Discount, bundle: BundleId) -> bool {
        if excepted(&discount.bundles).any(|id| id == bundle) {
            return false;
        }
        match discount.discount_type {
            DiscountType::AnyBundle => true,
            _ => included(&discount.bundles).any(|id| id == bundle),
        }
    }

    fn line_eligible(discount: &Discount, item: &BasketItem) -> bool {
        let kind_matches = match discount.discount_type {
            DiscountType::BundleOffer => item.kind == ItemKind::Product,
            DiscountType::BundleMasterclass => item.kind == ItemKind::Masterclass,
            _ => true,
        };
        kind_matches
            && item.qty > 0
            && (discount.bundle_items.is_empty() || discount.bundle_items.contains(&item.offer_id))
    }

    /// Lines of each complete, eligible bundle in the basket
    fn bundles(discount: &Discount, input: &PricingInput) -> BTreeMap<BundleId, Vec<usize>> {
        let mut groups: BTreeMap<BundleId, Vec<usize>> = BTreeMap::new();
        for (idx, item) in input.items.iter().enumerate() {
            if let Some(bundle) = item.bundle_id {
                if Self::bundle_eligible(discount, bundle) && Self::line_eligible(discount, item) {
                    groups.entry(bundle).or_default().push(idx);
                }
            }
        }

        // Every listed bundle item must be present
        groups.retain(|_, lines| {
            discount
                .bundle_items
                .iter()
                .all(|offer| lines.iter().any(|idx| input.items[*idx].offer_id == *offer))
        });
        groups
    }
}

impl DiscountApplier for BundleApplier {
    fn targets(&self, discount: &Discount, input: &PricingInput, _categories: &CategoryTree) -> Vec<usize> {
        Self::bundles(discount, input).into_values().flatten().collect()
    }

    fn apply(&self, discount: &Discount, input: &mut PricingInput, _categories: &CategoryTree) -> Decimal {
        let mut total = Decimal::ZERO;

        for (bundle, lines) in Self::bundles(discount, input) {
            if lines
                .iter()
                .any(|idx| !synergy_allows(discount, &input.items[*idx].discounts))
            {
                tracing::debug!("Discount {} blocked by synergy on bundle {}", discount.id, bundle);
                continue;
            }

            for idx in lines {
                let item = &mut input.items[idx];
                let amount = line_amount(discount, item);
                if amount > Decimal::ZERO {
                    item.apply_discount(discount, amount);
                    total += amount * item.qty_decimal();
                }
            }
        }

        total
    }
}
