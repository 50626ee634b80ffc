// Discount Appliers
//
// One applier per discount target kind. An applier picks the basket lines (or
// the delivery candidate) a discount aims at and mutates their price fields,
// returning the total amount taken off. Zero means "not applicable".

mod basket;
mod bundle;
mod delivery;
mod offer;

pub use basket::BasketApplier;
pub use bundle::BundleApplier;
pub use delivery::DeliveryApplier;
pub use offer::{OfferApplier, OfferScope};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::pricing::{
    config_store::CategoryTree,
    input::{BasketItem, ItemDiscount, PricingInput},
    models::{excepted, Discount},
    types::{DiscountType, ValueType},
};

pub trait DiscountApplier: Send + Sync {
    /// Indexes of the basket lines, or of the delivery candidate, the discount aims at
    fn targets(&self, discount: &Discount, input: &PricingInput, categories: &CategoryTree) -> Vec<usize>;

    /// Apply the discount, returning the total amount changed
    fn apply(&self, discount: &Discount, input: &mut PricingInput, categories: &CategoryTree) -> Decimal;

    /// Amount the discount would yield, leaving `input` untouched
    fn simulate(&self, discount: &Discount, input: &mut PricingInput, categories: &CategoryTree) -> Decimal {
        let snapshot = input.snapshot();
        let amount = self.apply(discount, input, categories);
        input.restore(&snapshot);
        amount
    }
}

/// Applier registered for a discount type
pub fn applier_for(discount_type: DiscountType) -> &'static dyn DiscountApplier {
    match discount_type {
        DiscountType::Offer => &OfferApplier {
            scope: OfferScope::Offer,
        },
        DiscountType::AnyOffer => &OfferApplier {
            scope: OfferScope::AnyOffer,
        },
        DiscountType::Brand => &OfferApplier {
            scope: OfferScope::Brand,
        },
        DiscountType::AnyBrand => &OfferApplier {
            scope: OfferScope::AnyBrand,
        },
        DiscountType::Category => &OfferApplier {
            scope: OfferScope::Category,
        },
        DiscountType::AnyCategory => &OfferApplier {
            scope: OfferScope::AnyCategory,
        },
        DiscountType::Masterclass => &OfferApplier {
            scope: OfferScope::Masterclass,
        },
        DiscountType::AnyMasterclass => &OfferApplier {
            scope: OfferScope::AnyMasterclass,
        },
        DiscountType::BundleOffer | DiscountType::BundleMasterclass | DiscountType::AnyBundle => {
            &BundleApplier
        }
        DiscountType::CartTotal => &BasketApplier,
        DiscountType::Delivery => &DeliveryApplier,
    }
}

/// Round half away from zero to whole currency units
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Unit amount before clamping: a percentage of `cost` or the fixed value
pub fn nominal_amount(discount: &Discount, cost: Decimal) -> Decimal {
    match discount.value_type {
        ValueType::Percent => round_money(cost * discount.value / Decimal::ONE_HUNDRED),
        ValueType::FixedAmount => discount.value,
    }
}

/// Discount that makes an item of this cost free: 100% or the full cost
pub fn is_free_discount(discount: &Discount, cost: Decimal) -> bool {
    match discount.value_type {
        ValueType::Percent => discount.value == Decimal::ONE_HUNDRED,
        ValueType::FixedAmount => discount.value >= cost,
    }
}

/// Every other discount already on the target must be in the synergy list
pub fn synergy_allows(discount: &Discount, applied: &[ItemDiscount]) -> bool {
    let others: Vec<_> = applied
        .iter()
        .filter(|d| d.discount_id != discount.id)
        .collect();
    if others.is_empty() {
        return true;
    }
    let synergy = discount.synergy_ids();
    others.iter().all(|d| synergy.contains(&d.discount_id))
}

/// Per-unit ceiling from the synergy condition, when the target already carries other discounts
pub fn synergy_cap(discount: &Discount, cost: Decimal, applied: &[ItemDiscount]) -> Option<Decimal> {
    if applied.iter().all(|d| d.discount_id == discount.id) {
        return None;
    }
    let payload = &discount.synergy_condition()?.payload;
    let max_value = payload.max_value?;
    Some(match payload.max_value_type.unwrap_or(ValueType::FixedAmount) {
        ValueType::Percent => round_money(cost * max_value / Decimal::ONE_HUNDRED),
        ValueType::FixedAmount => max_value,
    })
}

/// Unit amount the discount can still add to a line
///
/// Takes the room above the price floor and the synergy ceiling into account,
/// minus what this discount already put on the line.
pub fn headroom(discount: &Discount, item: &BasketItem) -> Decimal {
    let room = item.room();
    match synergy_cap(discount, item.cost, &item.discounts) {
        Some(cap) => {
            let already = item
                .discounts
                .iter()
                .filter(|d| d.discount_id == discount.id)
                .map(|d| d.change)
                .sum::<Decimal>();
            room.min(cap - already).max(Decimal::ZERO)
        }
        None => room,
    }
}

/// Clamped unit amount of an item-level discount on one line
pub fn line_amount(discount: &Discount, item: &BasketItem) -> Decimal {
    let mut amount = nominal_amount(discount, item.cost);

    if let Some(limit) = discount.product_qty_limit {
        if limit > 0 && item.qty > limit {
            amount = round_money(amount * Decimal::from(limit) / item.qty_decimal());
        }
    }

    amount.min(headroom(discount, item)).max(Decimal::ZERO)
}

/// Discount restricted to a merchant only reaches that merchant's lines
pub(crate) fn merchant_matches(discount: &Discount, item: &BasketItem) -> bool {
    match discount.merchant_id {
        Some(merchant) => item.merchant_id == Some(merchant),
        None => true,
    }
}

pub(crate) fn offer_excepted(discount: &Discount, item: &BasketItem) -> bool {
    excepted(&discount.offers).any(|id| id == item.offer_id)
}
