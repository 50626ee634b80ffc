// Delivery applier, priced against the current delivery candidate

use rust_decimal::Decimal;

use super::{nominal_amount, synergy_allows, DiscountApplier};
use crate::pricing::{config_store::CategoryTree, input::PricingInput, models::Discount};

pub struct DeliveryApplier;

impl DiscountApplier for DeliveryApplier {
    fn targets(&self, _discount: &Discount, input: &PricingInput, _categories: &CategoryTree) -> Vec<usize> {
        match input.deliveries.current {
            Some(idx) if idx < input.deliveries.items.len() => vec![idx],
            _ => Vec::new(),
        }
    }

    fn apply(&self, discount: &Discount, input: &mut PricingInput, _categories: &CategoryTree) -> Decimal {
        let Some(delivery) = input.deliveries.current_mut() else {
            return Decimal::ZERO;
        };
        if !synergy_allows(discount, &delivery.discounts) {
            return Decimal::ZERO;
        }

        let amount = nominal_amount(discount, delivery.cost)
            .min(delivery.room())
            .max(Decimal::ZERO);
        if amount > Decimal::ZERO {
            delivery.apply_discount(discount, amount);
        }
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::input::DeliveryOption;
    use crate::pricing::types::{DiscountType, ValueType};
    use rust_decimal_macros::dec;

    fn input() -> PricingInput {
        let mut input = PricingInput::default();
        input.deliveries.items = vec![
            DeliveryOption::new(0, 1, dec!(300)),
            DeliveryOption::new(1, 2, dec!(150)),
        ];
        input
    }

    #[test]
    fn test_no_current_delivery() {
        let mut input = input();
        let discount = Discount::new(1, DiscountType::Delivery, dec!(50), ValueType::Percent);

        assert!(DeliveryApplier.targets(&discount, &input, &CategoryTree::default()).is_empty());
        assert_eq!(DeliveryApplier.apply(&discount, &mut input, &CategoryTree::default()), dec!(0));
    }

    #[test]
    fn test_discount_current_delivery_down_to_zero() {
        let mut input = input();
        input.deliveries.current = Some(1);
        let discount = Discount::new(1, DiscountType::Delivery, dec!(200), ValueType::FixedAmount);

        assert_eq!(DeliveryApplier.apply(&discount, &mut input, &CategoryTree::default()), dec!(150));
        assert_eq!(input.deliveries.items[1].price, dec!(0));
        assert_eq!(input.deliveries.items[0].price, dec!(300));
    }
}
