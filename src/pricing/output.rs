// Pricing output model
//
// What a pricing run reports back: applied discounts, bonuses and promo code,
// plus every basket line and delivery candidate with its final price fields.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::pricing::{
    input::{BasketItem, DeliveryOption, ItemBonus, ItemDiscount, PricingInput},
    models::Discount,
    types::{
        BonusId, BonusType, BundleId, ConditionType, DeliveryMethodId, DiscountId, DiscountType,
        OfferId, PromoCodeId, PromoCodeOutcome, PromoCodeType, ValueType,
    },
};

/// Discount that changed at least one line or the selected delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedDiscount {
    pub discount_id: DiscountId,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub value_type: ValueType,
    /// Total amount taken off, across quantities
    pub change: Decimal,
    pub conditions: Vec<ConditionType>,
    pub synergy: Vec<DiscountId>,
    pub summarizable_with_all: bool,
    pub max_priority: bool,
    pub promo_code: bool,
}

impl AppliedDiscount {
    pub fn new(discount: &Discount, change: Decimal, promo_code: bool) -> Self {
        Self {
            discount_id: discount.id,
            name: discount.name.clone(),
            discount_type: discount.discount_type,
            value: discount.value,
            value_type: discount.value_type,
            change,
            conditions: discount.condition_types(),
            synergy: discount.synergy_ids(),
            summarizable_with_all: discount.summarizable_with_all,
            max_priority: discount.max_priority,
            promo_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedBonus {
    pub bonus_id: BonusId,
    pub bonus_type: BonusType,
    /// Total points accrued by this rule
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedPromoCode {
    pub id: PromoCodeId,
    pub code: String,
    #[serde(rename = "type")]
    pub promo_type: PromoCodeType,
    pub status: PromoCodeOutcome,
    /// Currency taken off, or points accrued for bonus codes
    pub change: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedOffer {
    pub offer_id: OfferId,
    pub bundle_id: Option<BundleId>,
    pub qty: u32,
    pub price: Decimal,
    pub cost: Decimal,
    pub discount: Decimal,
    pub total_price: Decimal,
    pub total_cost: Decimal,
    pub discounts: Vec<ItemDiscount>,
    pub bonus: i64,
    pub bonuses: Vec<ItemBonus>,
    pub bonus_spent: i64,
    pub bonus_discount: Decimal,
}

impl From<&BasketItem> for PricedOffer {
    fn from(item: &BasketItem) -> Self {
        Self {
            offer_id: item.offer_id,
            bundle_id: item.bundle_id,
            qty: item.qty,
            price: item.price,
            cost: item.cost,
            discount: item.discount,
            total_price: item.total_price(),
            total_cost: item.total_cost(),
            discounts: item.discounts.clone(),
            bonus: item.bonus,
            bonuses: item.bonuses.clone(),
            bonus_spent: item.bonus_spent,
            bonus_discount: item.bonus_discount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedDelivery {
    pub id: usize,
    pub method: DeliveryMethodId,
    pub price: Decimal,
    pub cost: Decimal,
    pub discount: Decimal,
    pub discounts: Vec<ItemDiscount>,
    pub selected: bool,
}

impl PricedDelivery {
    fn new(delivery: &DeliveryOption, selected: bool) -> Self {
        Self {
            id: delivery.id,
            method: delivery.method,
            price: delivery.price,
            cost: delivery.cost,
            discount: delivery.discount,
            discounts: delivery.discounts.clone(),
            selected,
        }
    }
}

/// Result of a basket calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingOutput {
    pub applied_promo_code: Option<AppliedPromoCode>,
    pub applied_discounts: Vec<AppliedDiscount>,
    pub applied_bonuses: Vec<AppliedBonus>,
    /// Points the customer could spend on this basket
    pub max_spendable_bonus: i64,
    pub bonus_spent: i64,
    pub bonus_discount: Decimal,
    pub total_cost: Decimal,
    pub total_price: Decimal,
    pub total_discount: Decimal,
    pub total_bonus: i64,
    pub offers: Vec<PricedOffer>,
    pub deliveries: Vec<PricedDelivery>,
}

impl PricingOutput {
    pub fn assemble(
        input: &PricingInput,
        applied_promo_code: Option<AppliedPromoCode>,
        applied_discounts: Vec<AppliedDiscount>,
        applied_bonuses: Vec<AppliedBonus>,
        max_spendable_bonus: i64,
    ) -> Self {
        let total_cost = input.total_cost();
        let total_price = input.total_price();

        Self {
            applied_promo_code,
            total_bonus: applied_bonuses.iter().map(|b| b.value).sum(),
            applied_discounts,
            applied_bonuses,
            max_spendable_bonus,
            bonus_spent: input.items.iter().map(|i| i.bonus_spent).sum(),
            bonus_discount: input.items.iter().map(|i| i.bonus_discount).sum(),
            total_cost,
            total_price,
            total_discount: total_cost - total_price,
            offers: input.items.iter().map(PricedOffer::from).collect(),
            deliveries: input
                .deliveries
                .items
                .iter()
                .enumerate()
                .map(|(idx, d)| PricedDelivery::new(d, input.deliveries.selected == Some(idx)))
                .collect(),
        }
    }
}

/// Product-card price of one offer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPrice {
    pub offer_id: OfferId,
    pub price: Decimal,
    pub cost: Decimal,
    pub discounts: Vec<ItemDiscount>,
    pub bonus: i64,
}

impl From<&BasketItem> for CatalogPrice {
    fn from(item: &BasketItem) -> Self {
        Self {
            offer_id: item.offer_id,
            price: item.price,
            cost: item.cost,
            discounts: item.discounts.clone(),
            bonus: item.bonus,
        }
    }
}
