// Cart-total applier
//
// Spreads one order-level amount over the basket lines in whole currency
// units, proportionally to line totals, then pushes any remainder onto lines
// that still have room. A line moves in steps of its quantity, so a leftover
// no line can take in equal unit steps stays undistributed.

use rust_decimal::Decimal;

use super::{headroom, merchant_matches, offer_excepted, round_money, synergy_allows, DiscountApplier};
use crate::pricing::{
    config_store::CategoryTree,
    input::PricingInput,
    models::{excepted, Discount},
    types::ValueType,
};

pub struct BasketApplier;

impl BasketApplier {
    /// Order-level amount the discount aims to take off
    fn target_amount(discount: &Discount, eligible_total: Decimal) -> Decimal {
        match discount.value_type {
            ValueType::Percent => round_money(eligible_total * discount.value / Decimal::ONE_HUNDRED),
            ValueType::FixedAmount => discount.value,
        }
    }
}

impl DiscountApplier for BasketApplier {
    fn targets(&self, discount: &Discount, input: &PricingInput, categories: &CategoryTree) -> Vec<usize> {
        input
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.qty > 0
                    && merchant_matches(discount, item)
                    && !offer_excepted(discount, item)
                    && !matches!(item.brand_id, Some(brand)
                        if excepted(&discount.brands).any(|id| id == brand))
                    && !matches!(item.category_id, Some(category)
                        if categories.is_under_any(category, excepted(&discount.categories)))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn apply(&self, discount: &Discount, input: &mut PricingInput, categories: &CategoryTree) -> Decimal {
        let lines: Vec<usize> = self
            .targets(discount, input, categories)
            .into_iter()
            .filter(|idx| synergy_allows(discount, &input.items[*idx].discounts))
            .collect();

        let eligible_total: Decimal = lines.iter().map(|idx| input.items[*idx].total_price()).sum();
        if eligible_total <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let target = Self::target_amount(discount, eligible_total);
        let mut remaining = target;

        // Proportional pass, largest line first
        let mut largest_first = lines.clone();
        largest_first.sort_by(|a, b| {
            input.items[*b]
                .total_price()
                .cmp(&input.items[*a].total_price())
        });
        for idx in largest_first {
            if remaining <= Decimal::ZERO {
                break;
            }
            let item = &mut input.items[idx];
            let qty = item.qty_decimal();
            let share = target * item.total_price() / eligible_total;
            let per_unit = (share / qty)
                .floor()
                .min((remaining / qty).floor())
                .min(headroom(discount, item))
                .max(Decimal::ZERO);

            if per_unit > Decimal::ZERO {
                item.apply_discount(discount, per_unit);
                remaining -= per_unit * qty;
            }
        }

        // Forced passes, cheapest line first, until nothing moves
        let mut cheapest_first = lines;
        cheapest_first.sort_by(|a, b| {
            input.items[*a]
                .total_price()
                .cmp(&input.items[*b].total_price())
        });
        while remaining > Decimal::ZERO {
            // A line that takes the whole remainder in equal unit steps ends the split
            let exact = cheapest_first.iter().copied().find(|idx| {
                let item = &input.items[*idx];
                let qty = item.qty_decimal();
                (remaining % qty).is_zero() && headroom(discount, item) * qty >= remaining
            });
            if let Some(idx) = exact {
                let item = &mut input.items[idx];
                let per_unit = remaining / item.qty_decimal();
                item.apply_discount(discount, per_unit);
                remaining = Decimal::ZERO;
                break;
            }

            let mut progressed = false;

            for idx in &cheapest_first {
                if remaining <= Decimal::ZERO {
                    break;
                }
                let item = &mut input.items[*idx];
                let qty = item.qty_decimal();
                let per_unit = (remaining / qty).floor().min(headroom(discount, item));

                if per_unit > Decimal::ZERO {
                    item.apply_discount(discount, per_unit);
                    remaining -= per_unit * qty;
                    progressed = true;
                }
            }

            if !progressed {
                break;
            }
        }

        if remaining > Decimal::ZERO {
            tracing::debug!(
                "Cart discount {} left {} undistributed",
                discount.id,
                remaining
            );
        }

        target - remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::input::BasketItem;
    use crate::pricing::models::ScopeRef;
    use crate::pricing::types::DiscountType;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn cart_discount(value: Decimal, value_type: ValueType) -> Discount {
        Discount::new(1, DiscountType::CartTotal, value, value_type)
    }

    #[test]
    fn test_even_split_over_equal_lines() {
        let mut input = PricingInput::new(vec![
            BasketItem::new(1, 1, dec!(100)),
            BasketItem::new(2, 1, dec!(100)),
            BasketItem::new(3, 1, dec!(100)),
        ]);

        let amount = BasketApplier.apply(
            &cart_discount(dec!(100), ValueType::FixedAmount),
            &mut input,
            &CategoryTree::default(),
        );

        assert_eq!(amount, dec!(100));
        let changes: Vec<Decimal> = input.items.iter().map(|i| i.discount).collect();
        assert_eq!(changes.iter().copied().sum::<Decimal>(), dec!(100));
        assert!(changes.iter().all(|c| *c == dec!(33) || *c == dec!(34)));
    }

    #[test]
    fn test_remainder_moves_to_lines_with_room() {
        let mut input = PricingInput::new(vec![
            BasketItem::new(1, 1, dec!(10)),
            BasketItem::new(2, 1, dec!(990)),
        ]);

        let amount = BasketApplier.apply(
            &cart_discount(dec!(500), ValueType::FixedAmount),
            &mut input,
            &CategoryTree::default(),
        );

        assert_eq!(amount, dec!(500));
        assert!(input.items.iter().all(|i| i.price >= dec!(1)));
    }

    #[test]
    fn test_target_capped_by_available_room() {
        let mut input = PricingInput::new(vec![BasketItem::new(1, 2, dec!(10))]);

        let amount = BasketApplier.apply(
            &cart_discount(dec!(100), ValueType::FixedAmount),
            &mut input,
            &CategoryTree::default(),
        );

        assert_eq!(amount, dec!(18));
        assert_eq!(input.items[0].price, dec!(1));
    }

    #[test]
    fn test_remainder_goes_to_line_whose_qty_divides_it() {
        let mut input = PricingInput::new(vec![
            BasketItem::new(1, 2, dec!(10)),
            BasketItem::new(2, 3, dec!(100)),
        ]);

        let amount = BasketApplier.apply(
            &cart_discount(dec!(6), ValueType::FixedAmount),
            &mut input,
            &CategoryTree::default(),
        );

        assert_eq!(amount, dec!(6));
        assert_eq!(input.items[0].price, dec!(10));
        assert_eq!(input.items[1].price, dec!(98));
    }

    #[test]
    fn test_leftover_below_line_qty_stays_undistributed() {
        let mut input = PricingInput::new(vec![BasketItem::new(1, 3, dec!(100))]);

        let amount = BasketApplier.apply(
            &cart_discount(dec!(100), ValueType::FixedAmount),
            &mut input,
            &CategoryTree::default(),
        );

        assert_eq!(amount, dec!(99));
        assert_eq!(input.items[0].price, dec!(67));
        assert_eq!(input.items[0].discounts[0].change, dec!(33));
    }

    #[test]
    fn test_percent_of_eligible_total() {
        let mut input = PricingInput::new(vec![
            BasketItem::new(1, 2, dec!(150)),
            BasketItem::new(2, 1, dec!(200)),
        ]);
        let mut discount = cart_discount(dec!(10), ValueType::Percent);
        discount.offers = vec![ScopeRef::except(2)];

        let amount = BasketApplier.apply(&discount, &mut input, &CategoryTree::default());
        assert_eq!(amount, dec!(30));
        assert_eq!(input.items[0].price, dec!(135));
        assert_eq!(input.items[1].price, dec!(200));
    }

    proptest! {
        #[test]
        fn prop_split_matches_recorded_changes(
            prices in prop::collection::vec(50u32..5000, 1..6),
            qtys in prop::collection::vec(1u32..5, 6),
            target in 1u32..40,
        ) {
            let items: Vec<BasketItem> = prices
                .iter()
                .zip(&qtys)
                .enumerate()
                .map(|(idx, (price, qty))| BasketItem::new(idx as i64, *qty, Decimal::from(*price)))
                .collect();
            let mut input = PricingInput::new(items);
            let discount = cart_discount(Decimal::from(target), ValueType::FixedAmount);

            let amount = BasketApplier.apply(&discount, &mut input, &CategoryTree::default());
            let distributed: Decimal = input.items.iter().map(|i| i.discount * i.qty_decimal()).sum();

            prop_assert_eq!(amount, distributed);
            prop_assert!(amount <= Decimal::from(target));
            for item in &input.items {
                prop_assert!(item.price >= item.lowest_possible_price());
            }
        }
    }
}
