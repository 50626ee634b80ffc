// Bonus spending
//
// Plans how many points can pay for which lines: each line is capped at a
// share of its price (a lower share once it is discounted) and the order at a
// share of its total. Lines with fewer units and higher prices go first so the
// spend lands on as few lines as possible.

use rust_decimal::Decimal;

use super::to_points;
use crate::pricing::{config_store::PricingOptions, input::PricingInput};

/// Currency payable with points, per line index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BonusSpendPlan {
    pub lines: Vec<(usize, Decimal)>,
    pub currency: Decimal,
    pub points: i64,
}

pub struct BonusSpendPlanner<'a> {
    options: &'a PricingOptions,
}

impl<'a> BonusSpendPlanner<'a> {
    pub fn new(options: &'a PricingOptions) -> Self {
        Self { options }
    }

    fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
        (amount * percent / Decimal::ONE_HUNDRED).floor()
    }

    /// Plan spending up to `pool` points
    pub fn plan(&self, input: &PricingInput, pool: i64) -> BonusSpendPlan {
        if pool <= 0 || input.payment.map(|p| p.is_deferred()).unwrap_or(false) {
            return BonusSpendPlan::default();
        }

        let ratio = self.options.bonus_per_currency_unit;
        let pool_currency = (Decimal::from(pool) / ratio).floor();
        let order_cap = Self::percent_of(input.total_price(), self.options.max_debit_percent_for_order);
        let mut budget = pool_currency.min(order_cap);

        let mut order: Vec<usize> = (0..input.items.len())
            .filter(|idx| input.items[*idx].qty > 0)
            .collect();
        order.sort_by(|a, b| {
            let (a, b) = (&input.items[*a], &input.items[*b]);
            a.qty.cmp(&b.qty).then_with(|| b.price.cmp(&a.price))
        });

        let mut plan = BonusSpendPlan::default();
        for idx in order {
            if budget <= Decimal::ZERO {
                break;
            }
            let item = &input.items[idx];
            let percent = if item.discounts.is_empty() {
                self.options.max_debit_percent_for_product
            } else {
                self.options.max_debit_percent_for_discount_product
            };
            let take = Self::percent_of(item.total_price(), percent).min(budget);
            if take > Decimal::ZERO {
                plan.lines.push((idx, take));
                plan.currency += take;
                budget -= take;
            }
        }

        plan.points = to_points((plan.currency * ratio).ceil()).min(pool);
        plan
    }
}

/// Preview of the most points the customer could spend on this basket
pub struct BonusMayBeSpentCalculator;

impl BonusMayBeSpentCalculator {
    pub fn calculate(options: &PricingOptions, input: &PricingInput) -> i64 {
        BonusSpendPlanner::new(options)
            .plan(input, input.customer.bonus_balance)
            .points
    }
}

/// Commits the requested spend onto the lines
///
/// Prices stay as they are; each line records the points and the currency
/// they pay for.
pub struct BonusSpentCalculator;

impl BonusSpentCalculator {
    pub fn calculate(options: &PricingOptions, input: &mut PricingInput) -> i64 {
        let pool = input.bonus_to_spend.min(input.customer.bonus_balance);
        let plan = BonusSpendPlanner::new(options).plan(input, pool);
        let ratio = options.bonus_per_currency_unit;

        let mut points_left = plan.points;
        for (idx, currency) in &plan.lines {
            let points = to_points((*currency * ratio).ceil()).min(points_left);
            let item = &mut input.items[*idx];
            item.bonus_discount = *currency;
            item.bonus_spent = points;
            points_left -= points;
        }

        if plan.points > 0 {
            tracing::info!("Spent {} points for {}", plan.points, plan.currency);
        }
        plan.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::input::BasketItem;
    use crate::pricing::models::Discount;
    use crate::pricing::types::{DiscountType, PaymentMethod, ValueType};
    use rust_decimal_macros::dec;

    fn basket() -> PricingInput {
        let mut input = PricingInput::new(vec![
            BasketItem::new(1, 3, dec!(100)),
            BasketItem::new(2, 1, dec!(200)),
            BasketItem::new(3, 1, dec!(500)),
        ]);
        input.customer.bonus_balance = 10_000;
        input
    }

    #[test]
    fn test_plan_orders_by_qty_then_price() {
        let options = PricingOptions::default();
        let plan = BonusSpendPlanner::new(&options).plan(&basket(), 600);

        // 99% of 500, then the rest of the pool on the 200 line
        assert_eq!(plan.lines, vec![(2, dec!(495)), (1, dec!(105))]);
        assert_eq!(plan.points, 600);
    }

    #[test]
    fn test_discounted_line_has_lower_cap() {
        let options = PricingOptions::default();
        let mut input = basket();
        let discount = Discount::new(1, DiscountType::AnyOffer, dec!(10), ValueType::FixedAmount);
        input.items[2].apply_discount(&discount, dec!(10));

        let plan = BonusSpendPlanner::new(&options).plan(&input, 300);
        assert_eq!(plan.lines[0], (2, dec!(245)));
    }

    #[test]
    fn test_order_cap() {
        let options = PricingOptions {
            max_debit_percent_for_order: dec!(10),
            ..Default::default()
        };
        let plan = BonusSpendPlanner::new(&options).plan(&basket(), 10_000);

        assert_eq!(plan.currency, dec!(100));
    }

    #[test]
    fn test_ratio_converts_points() {
        let options = PricingOptions {
            bonus_per_currency_unit: dec!(10),
            ..Default::default()
        };
        let plan = BonusSpendPlanner::new(&options).plan(&basket(), 1005);

        assert_eq!(plan.currency, dec!(100));
        assert_eq!(plan.points, 1000);
    }

    #[test]
    fn test_may_be_spent_uses_balance() {
        let options = PricingOptions::default();
        let mut input = basket();
        input.customer.bonus_balance = 50;

        assert_eq!(BonusMayBeSpentCalculator::calculate(&options, &input), 50);
        assert!(input.items.iter().all(|i| i.bonus_spent == 0));
    }

    #[test]
    fn test_spent_records_without_changing_price() {
        let options = PricingOptions::default();
        let mut input = basket();
        input.bonus_to_spend = 300;

        let spent = BonusSpentCalculator::calculate(&options, &mut input);

        assert_eq!(spent, 300);
        assert_eq!(input.items[2].bonus_spent, 300);
        assert_eq!(input.items[2].bonus_discount, dec!(300));
        assert_eq!(input.items[2].price, dec!(500));
    }

    #[test]
    fn test_request_capped_by_balance_and_payment() {
        let options = PricingOptions::default();
        let mut input = basket();
        input.bonus_to_spend = 300;
        input.customer.bonus_balance = 20;
        assert_eq!(BonusSpentCalculator::calculate(&options, &mut input), 20);

        let mut input = basket();
        input.bonus_to_spend = 300;
        input.payment = Some(PaymentMethod::Credit);
        assert_eq!(BonusSpentCalculator::calculate(&options, &mut input), 0);
    }
}
