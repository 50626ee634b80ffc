// Promo Code Calculator
//
// Resolves a code to one redeemable record, then dispatches on what the code
// grants. The effect of a discount code is measured in isolation and rolled
// back; its discount then competes in the real pass like any other candidate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::pricing::{
    bonus::BonusCalculator,
    calculator::DiscountCalculator,
    catalog::{MarketingSource, OrderLookup},
    config_store::CategoryTree,
    error::PricingResult,
    fetcher::DiscountFetcher,
    input::{Customer, PricingInput},
    models::{Bonus, Discount, PromoCode},
    output::{AppliedBonus, AppliedPromoCode},
    types::{PromoCodeOutcome, PromoCodeType},
};

/// Whether `customer` may redeem `promo` after `usage` earlier redemptions
pub fn is_redeemable(promo: &PromoCode, customer: &Customer, usage: u32, now: DateTime<Utc>) -> bool {
    if !promo.is_active_at(now) {
        return false;
    }

    let conditions = &promo.conditions;
    if !conditions.customer_ids.is_empty()
        && !customer
            .id
            .map(|id| conditions.customer_ids.contains(&id))
            .unwrap_or(false)
    {
        return false;
    }
    if !conditions.segment_ids.is_empty()
        && !customer
            .segment
            .map(|s| conditions.segment_ids.contains(&s))
            .unwrap_or(false)
    {
        return false;
    }
    if !conditions.role_ids.is_empty()
        && !customer.roles.iter().any(|r| conditions.role_ids.contains(r))
    {
        return false;
    }

    match promo.counter {
        Some(counter) => usage < counter,
        None => true,
    }
}

/// Looks a code up and checks it against the customer
pub struct PromoCodeResolver {
    marketing: Arc<dyn MarketingSource>,
    orders: Arc<dyn OrderLookup>,
}

impl PromoCodeResolver {
    pub fn new(marketing: Arc<dyn MarketingSource>, orders: Arc<dyn OrderLookup>) -> Self {
        Self { marketing, orders }
    }

    /// `None` when the code is unknown or not redeemable by this customer
    pub async fn resolve(
        &self,
        code: &str,
        customer: &Customer,
        now: DateTime<Utc>,
    ) -> PricingResult<Option<PromoCode>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let Some(promo) = self.marketing.promo_code(code).await? else {
            tracing::debug!("Promo code {} not found", code);
            return Ok(None);
        };

        let usage = match (customer.id, promo.counter) {
            (Some(customer_id), Some(_)) => self.orders.promo_code_usage(customer_id, promo.id).await?,
            _ => 0,
        };

        if is_redeemable(&promo, customer, usage, now) {
            Ok(Some(promo))
        } else {
            tracing::debug!("Promo code {} rejected for this customer", code);
            Ok(None)
        }
    }
}

pub struct PromoCodeCalculator<'a> {
    categories: &'a CategoryTree,
}

impl<'a> PromoCodeCalculator<'a> {
    pub fn new(categories: &'a CategoryTree) -> Self {
        Self { categories }
    }

    /// Unlock what the code grants on `input` and report its effect
    pub fn calculate(
        &self,
        promo: &PromoCode,
        input: &mut PricingInput,
        discounts: &[Discount],
        bonuses: &[Bonus],
        now: DateTime<Utc>,
    ) -> AppliedPromoCode {
        let change = match promo.promo_type {
            PromoCodeType::Discount => self.measure_discount(promo, input, discounts, now),
            PromoCodeType::Delivery => {
                input.free_delivery = true;
                input
                    .deliveries
                    .selected
                    .and_then(|idx| input.deliveries.items.get(idx))
                    .map(|d| d.price)
                    .unwrap_or(Decimal::ZERO)
            }
            PromoCodeType::Bonus => self.measure_bonus(promo, input, bonuses, now),
            PromoCodeType::Gift => Decimal::ZERO,
        };

        let status = if change > Decimal::ZERO || promo.promo_type == PromoCodeType::Gift {
            PromoCodeOutcome::Applied
        } else {
            PromoCodeOutcome::NotApplied
        };
        tracing::info!("Promo code {} resolved as {:?}, change {}", promo.code, status, change);

        AppliedPromoCode {
            id: promo.id,
            code: promo.code.clone(),
            promo_type: promo.promo_type,
            status,
            change,
        }
    }

    fn measure_discount(
        &self,
        promo: &PromoCode,
        input: &mut PricingInput,
        discounts: &[Discount],
        now: DateTime<Utc>,
    ) -> Decimal {
        let Some(discount_id) = promo.discount_id else {
            return Decimal::ZERO;
        };
        if !input.promo_discount_ids.contains(&discount_id) {
            input.promo_discount_ids.push(discount_id);
        }

        let Some(discount) = discounts.iter().find(|d| d.id == discount_id) else {
            tracing::warn!("Promo code {} points at missing discount {}", promo.code, discount_id);
            return Decimal::ZERO;
        };

        let candidates =
            DiscountFetcher::select(std::slice::from_ref(discount), input, self.categories, None, now);
        DiscountCalculator::new(self.categories).measure(input, candidates)
    }

    fn measure_bonus(
        &self,
        promo: &PromoCode,
        input: &mut PricingInput,
        bonuses: &[Bonus],
        now: DateTime<Utc>,
    ) -> Decimal {
        let Some(bonus_id) = promo.bonus_id else {
            return Decimal::ZERO;
        };
        if !input.promo_bonus_ids.contains(&bonus_id) {
            input.promo_bonus_ids.push(bonus_id);
        }

        let scoped: Vec<Bonus> = bonuses.iter().filter(|b| b.id == bonus_id).cloned().collect();
        let eligible = BonusCalculator::eligible(&scoped, input, now);
        Decimal::from(BonusCalculator::new(self.categories).measure(input, &eligible))
    }

    /// Replace a bonus code's estimate with what the final accrual granted
    pub fn settle_bonus(promo: &PromoCode, applied: &mut AppliedPromoCode, bonuses: &[AppliedBonus]) {
        if promo.promo_type != PromoCodeType::Bonus {
            return;
        }
        let points: i64 = bonuses
            .iter()
            .filter(|b| Some(b.bonus_id) == promo.bonus_id)
            .map(|b| b.value)
            .sum();

        applied.change = Decimal::from(points);
        applied.status = if points > 0 {
            PromoCodeOutcome::Applied
        } else {
            PromoCodeOutcome::NotApplied
        };
    }
}
