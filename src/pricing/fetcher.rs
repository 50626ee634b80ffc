// Discount Fetcher
//
// Selects the discounts a pricing run may consider: active, inside their
// validity window, promo-code-only ones only when unlocked, optionally limited
// to a set of types. Relations are narrowed to what the basket actually holds.

use chrono::{DateTime, Utc};

use crate::pricing::{
    config_store::CategoryTree,
    input::PricingInput,
    models::{Discount, ScopeRef},
    types::DiscountType,
};

pub struct DiscountFetcher;

impl DiscountFetcher {
    /// Candidate discounts out of an already loaded list
    pub fn select(
        discounts: &[Discount],
        input: &PricingInput,
        categories: &CategoryTree,
        types: Option<&[DiscountType]>,
        now: DateTime<Utc>,
    ) -> Vec<Discount> {
        let candidates: Vec<Discount> = discounts
            .iter()
            .filter(|d| d.is_active_at(now))
            .filter(|d| !d.promo_code_only || input.is_promo_discount(d.id))
            .filter(|d| match types {
                Some(types) => types.contains(&d.discount_type),
                None => true,
            })
            .map(|d| narrow_relations(d.clone(), input, categories))
            .collect();

        tracing::debug!(
            "Selected {} of {} discounts as candidates",
            candidates.len(),
            discounts.len()
        );
        candidates
    }
}

/// Drop relation rows that cannot match anything in the basket
///
/// Bundle contents are kept whole so bundle completeness can still be checked.
fn narrow_relations(mut discount: Discount, input: &PricingInput, categories: &CategoryTree) -> Discount {
    let offers = input.offer_ids();
    let brands = input.brand_ids();
    let basket_categories = input.category_ids();
    let bundles = input.bundle_ids();
    let events: Vec<_> = input.items.iter().filter_map(|i| i.public_event_id).collect();

    retain_present(&mut discount.offers, &offers);
    retain_present(&mut discount.brands, &brands);
    retain_present(&mut discount.bundles, &bundles);
    retain_present(&mut discount.public_events, &events);
    discount.categories.retain(|r| {
        basket_categories
            .iter()
            .any(|category| categories.is_self_or_descendant(*category, r.id))
    });

    discount
}

fn retain_present<T: Copy + PartialEq>(refs: &mut Vec<ScopeRef<T>>, present: &[T]) {
    refs.retain(|r| present.contains(&r.id));
}
