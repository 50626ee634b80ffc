// Bonus Calculator
//
// Accrues loyalty points on post-discount prices. Several bonus rules may
// accrue on the same line; nothing is earned on deferred payment methods.

mod spend;

pub use spend::{BonusMayBeSpentCalculator, BonusSpendPlan, BonusSpendPlanner, BonusSpentCalculator};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::pricing::{
    appliers::round_money,
    config_store::CategoryTree,
    input::{BasketItem, ItemBonus, ItemKind, PricingInput},
    models::{excepted, included, Bonus},
    output::AppliedBonus,
    types::{BonusType, ValueType},
};

/// Convert a whole-unit decimal to points
pub(crate) fn to_points(value: Decimal) -> i64 {
    round_money(value).to_i64().unwrap_or(0)
}

pub struct BonusCalculator<'a> {
    categories: &'a CategoryTree,
}

impl<'a> BonusCalculator<'a> {
    pub fn new(categories: &'a CategoryTree) -> Self {
        Self { categories }
    }

    /// Active bonuses, promo-code-only ones only when unlocked
    pub fn eligible(bonuses: &[Bonus], input: &PricingInput, now: DateTime<Utc>) -> Vec<Bonus> {
        bonuses
            .iter()
            .filter(|b| b.is_active_at(now))
            .filter(|b| !b.promo_code_only || input.promo_bonus_ids.contains(&b.id))
            .cloned()
            .collect()
    }

    fn matches(&self, bonus: &Bonus, item: &BasketItem) -> bool {
        if excepted(&bonus.offers).any(|id| id == item.offer_id) {
            return false;
        }
        let product = item.kind == ItemKind::Product;

        match bonus.bonus_type {
            BonusType::Offer => product && included(&bonus.offers).any(|id| id == item.offer_id),
            BonusType::AnyOffer => product,
            BonusType::Brand => match item.brand_id {
                Some(brand) if product => {
                    included(&bonus.brands).any(|id| id == brand)
                        && !excepted(&bonus.brands).any(|id| id == brand)
                }
                _ => false,
            },
            BonusType::AnyBrand => match item.brand_id {
                Some(brand) if product => !excepted(&bonus.brands).any(|id| id == brand),
                _ => false,
            },
            BonusType::Category => match item.category_id {
                Some(category) if product => {
                    self.categories
                        .is_under_any(category, included(&bonus.categories))
                        && !self
                            .categories
                            .is_under_any(category, excepted(&bonus.categories))
                }
                _ => false,
            },
            BonusType::AnyCategory => match item.category_id {
                Some(category) if product => !self
                    .categories
                    .is_under_any(category, excepted(&bonus.categories)),
                _ => false,
            },
            BonusType::Service => {
                let wanted: Vec<_> = included(&bonus.public_events).collect();
                item.kind == ItemKind::Masterclass
                    && match item.public_event_id {
                        Some(event) => {
                            (wanted.is_empty() || wanted.contains(&event))
                                && !excepted(&bonus.public_events).any(|id| id == event)
                        }
                        None => wanted.is_empty(),
                    }
            }
            BonusType::CartTotal => true,
        }
    }

    /// Accrue points on `input`, returning the points per rule
    ///
    /// A fixed cart-total bonus is earned once per order and is not attributed
    /// to a line.
    pub fn calculate(&self, input: &mut PricingInput, bonuses: &[Bonus]) -> Vec<AppliedBonus> {
        if input.payment.map(|p| p.is_deferred()).unwrap_or(false) {
            tracing::debug!("Deferred payment, no bonus accrual");
            return Vec::new();
        }

        let mut applied = Vec::new();

        for bonus in bonuses {
            let order_level =
                bonus.bonus_type == BonusType::CartTotal && bonus.value_type == ValueType::FixedAmount;

            let mut total: i64 = 0;
            if order_level {
                if !input.items.is_empty() {
                    total = to_points(bonus.value);
                }
            } else {
                let targets: Vec<usize> = input
                    .items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| item.qty > 0 && self.matches(bonus, item))
                    .map(|(idx, _)| idx)
                    .collect();

                for idx in targets {
                    let item = &mut input.items[idx];
                    let per_unit = match bonus.value_type {
                        ValueType::Percent => to_points(item.price * bonus.value / Decimal::ONE_HUNDRED),
                        ValueType::FixedAmount => to_points(bonus.value),
                    };
                    if per_unit <= 0 {
                        continue;
                    }

                    item.bonus += per_unit;
                    item.bonuses.push(ItemBonus {
                        bonus_id: bonus.id,
                        value: per_unit,
                    });
                    total += per_unit * i64::from(item.qty);
                }
            }

            if total > 0 {
                applied.push(AppliedBonus {
                    bonus_id: bonus.id,
                    bonus_type: bonus.bonus_type,
                    value: total,
                });
            }
        }

        applied
    }

    /// Points the bonuses would accrue, leaving `input` untouched
    pub fn measure(&self, input: &PricingInput, bonuses: &[Bonus]) -> i64 {
        let mut scratch = input.clone();
        self.calculate(&mut scratch, bonuses)
            .iter()
            .map(|b| b.value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::ScopeRef;
    use crate::pricing::types::{PaymentMethod, RecordStatus};
    use rust_decimal_macros::dec;

    fn basket() -> PricingInput {
        let mut first = BasketItem::new(1, 2, dec!(1000));
        first.brand_id = Some(5);
        first.price = dec!(900);
        let mut ticket = BasketItem::new(2, 1, dec!(300));
        ticket.kind = ItemKind::Masterclass;
        ticket.public_event_id = Some(40);
        PricingInput::new(vec![first, ticket])
    }

    #[test]
    fn test_percent_bonus_on_discounted_price() {
        let tree = CategoryTree::default();
        let mut input = basket();
        let mut bonus = Bonus::new(1, BonusType::Brand, dec!(5), ValueType::Percent);
        bonus.brands = vec![ScopeRef::include(5)];

        let applied = BonusCalculator::new(&tree).calculate(&mut input, &[bonus]);

        assert_eq!(input.items[0].bonus, 45);
        assert_eq!(applied[0].value, 90);
    }

    #[test]
    fn test_rules_accumulate_on_a_line() {
        let tree = CategoryTree::default();
        let mut input = basket();
        let any = Bonus::new(1, BonusType::AnyOffer, dec!(10), ValueType::FixedAmount);
        let cart = Bonus::new(2, BonusType::CartTotal, dec!(1), ValueType::Percent);

        let applied = BonusCalculator::new(&tree).calculate(&mut input, &[any, cart]);

        assert_eq!(input.items[0].bonus, 19);
        assert_eq!(input.items[0].bonuses.len(), 2);
        assert_eq!(input.items[1].bonus, 3);
        assert_eq!(applied.iter().map(|b| b.value).sum::<i64>(), 41);
    }

    #[test]
    fn test_service_bonus_and_order_level_bonus() {
        let tree = CategoryTree::default();
        let mut input = basket();
        let mut service = Bonus::new(1, BonusType::Service, dec!(20), ValueType::FixedAmount);
        service.public_events = vec![ScopeRef::include(40)];
        let order = Bonus::new(2, BonusType::CartTotal, dec!(100), ValueType::FixedAmount);

        let applied = BonusCalculator::new(&tree).calculate(&mut input, &[service, order]);

        assert_eq!(input.items[1].bonus, 20);
        assert_eq!(input.items[0].bonus, 0);
        assert_eq!(applied[1].value, 100);
    }

    #[test]
    fn test_deferred_payment_earns_nothing() {
        let tree = CategoryTree::default();
        let mut input = basket();
        input.payment = Some(PaymentMethod::Installment);
        let bonus = Bonus::new(1, BonusType::AnyOffer, dec!(10), ValueType::FixedAmount);

        assert!(BonusCalculator::new(&tree).calculate(&mut input, &[bonus]).is_empty());
        assert_eq!(input.items[0].bonus, 0);
    }

    #[test]
    fn test_empty_bonus_list_measures_zero() {
        let tree = CategoryTree::default();
        assert_eq!(BonusCalculator::new(&tree).measure(&basket(), &[]), 0);
    }

    #[test]
    fn test_eligibility_window_and_promo_only() {
        let now = Utc::now();
        let mut input = basket();
        let active = Bonus::new(1, BonusType::AnyOffer, dec!(1), ValueType::FixedAmount);
        let mut paused = Bonus::new(2, BonusType::AnyOffer, dec!(1), ValueType::FixedAmount);
        paused.status = RecordStatus::Paused;
        let mut promo = Bonus::new(3, BonusType::AnyOffer, dec!(1), ValueType::FixedAmount);
        promo.promo_code_only = true;
        let all = vec![active, paused, promo];

        assert_eq!(BonusCalculator::eligible(&all, &input, now).len(), 1);
        input.promo_bonus_ids.push(3);
        assert_eq!(BonusCalculator::eligible(&all, &input, now).len(), 2);
    }
}
