// Item-level applier for offer, brand, category and masterclass discounts

use rust_decimal::Decimal;

use super::{
    is_free_discount, line_amount, merchant_matches, offer_excepted, synergy_allows,
    DiscountApplier,
};
use crate::pricing::{
    config_store::CategoryTree,
    input::{BasketItem, ItemKind, PricingInput},
    models::{excepted, included, Discount},
};

/// Which standalone lines an item-level discount reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferScope {
    Offer,
    AnyOffer,
    Brand,
    AnyBrand,
    Category,
    AnyCategory,
    Masterclass,
    AnyMasterclass,
}

impl OfferScope {
    pub fn matches(&self, discount: &Discount, item: &BasketItem, categories: &CategoryTree) -> bool {
        if offer_excepted(discount, item) {
            return false;
        }

        match self {
            OfferScope::Offer => {
                item.kind == ItemKind::Product
                    && included(&discount.offers).any(|id| id == item.offer_id)
            }
            OfferScope::AnyOffer => item.kind == ItemKind::Product,
            OfferScope::Brand => match item.brand_id {
                Some(brand) if item.kind == ItemKind::Product => {
                    included(&discount.brands).any(|id| id == brand)
                        && !excepted(&discount.brands).any(|id| id == brand)
                }
                _ => false,
            },
            OfferScope::AnyBrand => match item.brand_id {
                Some(brand) if item.kind == ItemKind::Product => {
                    !excepted(&discount.brands).any(|id| id == brand)
                }
                _ => false,
            },
            OfferScope::Category => match item.category_id {
                Some(category) if item.kind == ItemKind::Product => {
                    categories.is_under_any(category, included(&discount.categories))
                        && !categories.is_under_any(category, excepted(&discount.categories))
                }
                _ => false,
            },
            OfferScope::AnyCategory => match item.category_id {
                Some(category) if item.kind == ItemKind::Product => {
                    !categories.is_under_any(category, excepted(&discount.categories))
                }
                _ => false,
            },
            OfferScope::Masterclass => {
                item.kind == ItemKind::Masterclass
                    && (included(&discount.offers).any(|id| id == item.offer_id)
                        || matches!(item.public_event_id, Some(event)
                            if included(&discount.public_events).any(|id| id == event)
                                && !excepted(&discount.public_events).any(|id| id == event)))
            }
            OfferScope::AnyMasterclass => {
                item.kind == ItemKind::Masterclass
                    && !matches!(item.public_event_id, Some(event)
                        if excepted(&discount.public_events).any(|id| id == event))
            }
        }
    }
}

pub struct OfferApplier {
    pub scope: OfferScope,
}

impl DiscountApplier for OfferApplier {
    fn targets(&self, discount: &Discount, input: &PricingInput, categories: &CategoryTree) -> Vec<usize> {
        input
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.qty > 0
                    && !item.is_bundled()
                    && merchant_matches(discount, item)
                    && self.scope.matches(discount, item, categories)
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn apply(&self, discount: &Discount, input: &mut PricingInput, categories: &CategoryTree) -> Decimal {
        let mut total = Decimal::ZERO;

        for idx in self.targets(discount, input, categories) {
            let item = &mut input.items[idx];
            if !synergy_allows(discount, &item.discounts) {
                tracing::debug!(
                    "Discount {} blocked by synergy on offer {}",
                    discount.id,
                    item.offer_id
                );
                continue;
            }

            let amount = line_amount(discount, item);
            if amount > Decimal::ZERO {
                item.apply_discount(discount, amount);
                total += amount * item.qty_decimal();
            } else if is_free_discount(discount, item.cost) {
                // Already at the floor; keep the attribution for the free-product pass
                item.attach_discount(discount);
            }
        }

        total
    }
}
