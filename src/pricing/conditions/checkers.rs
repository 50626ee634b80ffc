// Condition checkers, one per condition kind

use rust_decimal::Decimal;

use super::{ConditionChecker, ConditionContext};
use crate::pricing::{models::ConditionPayload, types::ConditionType};

/// Customer has no completed orders yet
pub struct FirstOrderCondition;

impl ConditionChecker for FirstOrderCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::FirstOrder
    }

    fn check(&self, _payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        ctx.input.customer.orders_count == 0
    }
}

/// Undiscounted basket total reaches `minPrice`
pub struct MinPriceOrderCondition;

impl ConditionChecker for MinPriceOrderCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::MinPriceOrder
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        match payload.min_price {
            Some(min_price) => ctx.input.total_cost() >= min_price,
            None => false,
        }
    }
}

/// Some listed brand alone reaches `minPrice`
pub struct MinPriceBrandCondition;

impl ConditionChecker for MinPriceBrandCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::MinPriceBrand
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        let Some(min_price) = payload.min_price else {
            return false;
        };

        let best = payload
            .brands
            .iter()
            .map(|brand| {
                ctx.input
                    .items
                    .iter()
                    .filter(|item| item.brand_id == Some(*brand))
                    .map(|item| item.total_price())
                    .sum::<Decimal>()
            })
            .max();

        matches!(best, Some(total) if total >= min_price)
    }
}

/// Some listed category, subcategories included, alone reaches `minPrice`
pub struct MinPriceCategoryCondition;

impl ConditionChecker for MinPriceCategoryCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::MinPriceCategory
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        let Some(min_price) = payload.min_price else {
            return false;
        };

        let best = payload
            .categories
            .iter()
            .map(|category| {
                ctx.input
                    .items
                    .iter()
                    .filter(|item| match item.category_id {
                        Some(id) => ctx.categories.is_self_or_descendant(id, *category),
                        None => false,
                    })
                    .map(|item| item.total_price())
                    .sum::<Decimal>()
            })
            .max();

        matches!(best, Some(total) if total >= min_price)
    }
}

/// A standalone line of `offer` holds at least `count` units
pub struct EveryUnitProductCondition;

impl ConditionChecker for EveryUnitProductCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::EveryUnitProduct
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        let (Some(offer), Some(count)) = (payload.offer, payload.count) else {
            return false;
        };

        ctx.input
            .find_item(offer, None)
            .map(|idx| ctx.input.items[idx].qty >= count)
            .unwrap_or(false)
    }
}

/// Current delivery candidate uses one of the listed methods
pub struct DeliveryMethodCondition;

impl ConditionChecker for DeliveryMethodCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::DeliveryMethod
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        match ctx.input.deliveries.current() {
            Some(delivery) => payload.delivery_methods.contains(&delivery.method),
            None => false,
        }
    }
}

pub struct PayMethodCondition;

impl ConditionChecker for PayMethodCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::PayMethod
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        match ctx.input.payment {
            Some(method) => payload.payment_methods.contains(&method),
            None => false,
        }
    }
}

pub struct RegionCondition;

impl ConditionChecker for RegionCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::Region
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        match ctx.input.region_id {
            Some(region) => payload.regions.contains(&region),
            None => false,
        }
    }
}

/// Customer is on the allow-list; guests never are
pub struct CustomerCondition;

impl ConditionChecker for CustomerCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::Customer
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        match ctx.input.customer.id {
            Some(id) => payload.customer_ids.contains(&id),
            None => false,
        }
    }
}

/// This order would be exactly every `count`-th order of the customer
pub struct OrderSequenceNumberCondition;

impl ConditionChecker for OrderSequenceNumberCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::OrderSequenceNumber
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        match payload.count {
            Some(every) if every > 0 => (ctx.input.customer.orders_count + 1) % every == 0,
            _ => false,
        }
    }
}

/// Enforced when the discount is applied
pub struct DiscountSynergyCondition;

impl ConditionChecker for DiscountSynergyCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::DiscountSynergy
    }

    fn check(&self, _payload: &ConditionPayload, _ctx: &ConditionContext<'_>) -> bool {
        true
    }
}

/// Bundle eligibility comes from the discount's bundle relations
pub struct BundleCondition;

impl ConditionChecker for BundleCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::Bundle
    }

    fn check(&self, _payload: &ConditionPayload, _ctx: &ConditionContext<'_>) -> bool {
        true
    }
}

/// Basket holds at least one item of the listed merchants
pub struct MerchantCondition;

impl ConditionChecker for MerchantCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::Merchant
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        ctx.input.items.iter().any(|item| match item.merchant_id {
            Some(merchant) => payload.merchants.contains(&merchant),
            None => false,
        })
    }
}

/// Some basket product carries `propertyId`, with one of `propertyValues` if any are listed
pub struct PropertyCondition;

impl ConditionChecker for PropertyCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::Property
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        let Some(property_id) = payload.property_id else {
            return false;
        };

        ctx.input.items.iter().any(|item| {
            item.properties.iter().any(|property| {
                property.property_id == property_id
                    && (payload.property_values.is_empty()
                        || payload.property_values.contains(&property.value))
            })
        })
    }
}

/// Basket holds at least `count` distinct offers
pub struct DifferentProductsCountCondition;

impl ConditionChecker for DifferentProductsCountCondition {
    fn condition_type(&self) -> ConditionType {
        ConditionType::DifferentProductsCount
    }

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool {
        match payload.count {
            Some(count) => ctx.input.offer_ids().len() >= count as usize,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::config_store::{CategoryNode, CategoryTree};
    use crate::pricing::input::{BasketItem, PricingInput, ProductProperty};
    use crate::pricing::types::PaymentMethod;
    use rust_decimal_macros::dec;

    fn item(offer: i64, qty: u32, price: Decimal, brand: i64, category: i64) -> BasketItem {
        let mut item = BasketItem::new(offer, qty, price);
        item.brand_id = Some(brand);
        item.category_id = Some(category);
        item
    }

    fn basket() -> PricingInput {
        PricingInput::new(vec![
            item(1, 2, dec!(300), 10, 3),
            item(2, 1, dec!(250), 11, 4),
            item(3, 1, dec!(100), 11, 4),
        ])
    }

    fn tree() -> CategoryTree {
        CategoryTree::new(vec![
            CategoryNode { id: 1, lft: 1, rgt: 8 },
            CategoryNode { id: 3, lft: 2, rgt: 3 },
            CategoryNode { id: 4, lft: 4, rgt: 5 },
        ])
    }

    fn min_price(amount: Decimal) -> ConditionPayload {
        ConditionPayload {
            min_price: Some(amount),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_order() {
        let mut input = basket();
        let tree = tree();
        assert!(FirstOrderCondition.check(&ConditionPayload::default(), &ConditionContext::new(&input, &tree)));

        input.customer.orders_count = 1;
        assert!(!FirstOrderCondition.check(&ConditionPayload::default(), &ConditionContext::new(&input, &tree)));
    }

    #[test]
    fn test_min_price_order_uses_cost() {
        let mut input = basket();
        input.items[0].price = dec!(10);
        let tree = tree();
        let ctx = ConditionContext::new(&input, &tree);

        assert!(MinPriceOrderCondition.check(&min_price(dec!(950)), &ctx));
        assert!(!MinPriceOrderCondition.check(&min_price(dec!(951)), &ctx));
        assert!(!MinPriceOrderCondition.check(&ConditionPayload::default(), &ctx));
    }

    #[test]
    fn test_min_price_brand_takes_best_brand() {
        let input = basket();
        let tree = tree();
        let ctx = ConditionContext::new(&input, &tree);

        let mut payload = min_price(dec!(600));
        payload.brands = vec![10, 11];
        assert!(MinPriceBrandCondition.check(&payload, &ctx));

        // Brands are not summed together
        payload.min_price = Some(dec!(601));
        assert!(!MinPriceBrandCondition.check(&payload, &ctx));
    }

    #[test]
    fn test_min_price_category_includes_descendants() {
        let input = basket();
        let tree = tree();
        let ctx = ConditionContext::new(&input, &tree);

        let mut payload = min_price(dec!(950));
        payload.categories = vec![1];
        assert!(MinPriceCategoryCondition.check(&payload, &ctx));

        payload.categories = vec![4];
        assert!(!MinPriceCategoryCondition.check(&payload, &ctx));
        payload.min_price = Some(dec!(350));
        assert!(MinPriceCategoryCondition.check(&payload, &ctx));
    }

    #[test]
    fn test_every_unit_product_ignores_bundle_lines() {
        let mut input = basket();
        let mut bundled = BasketItem::new(2, 5, dec!(250));
        bundled.bundle_id = Some(7);
        input.items.push(bundled);
        let tree = tree();
        let ctx = ConditionContext::new(&input, &tree);

        let payload = ConditionPayload {
            offer: Some(1),
            count: Some(2),
            ..Default::default()
        };
        assert!(EveryUnitProductCondition.check(&payload, &ctx));

        let payload = ConditionPayload {
            offer: Some(2),
            count: Some(2),
            ..Default::default()
        };
        assert!(!EveryUnitProductCondition.check(&payload, &ctx));
    }

    #[test]
    fn test_order_sequence_number() {
        let mut input = basket();
        let tree = tree();
        let payload = ConditionPayload {
            count: Some(3),
            ..Default::default()
        };

        input.customer.orders_count = 2;
        assert!(OrderSequenceNumberCondition.check(&payload, &ConditionContext::new(&input, &tree)));

        input.customer.orders_count = 3;
        assert!(!OrderSequenceNumberCondition.check(&payload, &ConditionContext::new(&input, &tree)));

        let zero = ConditionPayload {
            count: Some(0),
            ..Default::default()
        };
        assert!(!OrderSequenceNumberCondition.check(&zero, &ConditionContext::new(&input, &tree)));
    }

    #[test]
    fn test_list_membership_conditions() {
        let mut input = basket();
        input.payment = Some(PaymentMethod::Card);
        input.region_id = Some(5);
        input.customer.id = Some(42);
        let tree = tree();
        let ctx = ConditionContext::new(&input, &tree);

        let payload = ConditionPayload {
            payment_methods: vec![PaymentMethod::Card],
            regions: vec![5],
            customer_ids: vec![42],
            ..Default::default()
        };
        assert!(PayMethodCondition.check(&payload, &ctx));
        assert!(RegionCondition.check(&payload, &ctx));
        assert!(CustomerCondition.check(&payload, &ctx));

        let guest = basket();
        let ctx = ConditionContext::new(&guest, &tree);
        assert!(!PayMethodCondition.check(&payload, &ctx));
        assert!(!RegionCondition.check(&payload, &ctx));
        assert!(!CustomerCondition.check(&payload, &ctx));
    }

    #[test]
    fn test_merchant_property_and_distinct_offers() {
        let mut input = basket();
        input.items[1].merchant_id = Some(8);
        input.items[2].properties = vec![ProductProperty {
            property_id: 4,
            value: "red".to_string(),
        }];
        let tree = tree();
        let ctx = ConditionContext::new(&input, &tree);

        let payload = ConditionPayload {
            merchants: vec![8],
            property_id: Some(4),
            property_values: vec!["red".to_string()],
            count: Some(3),
            ..Default::default()
        };
        assert!(MerchantCondition.check(&payload, &ctx));
        assert!(PropertyCondition.check(&payload, &ctx));
        assert!(DifferentProductsCountCondition.check(&payload, &ctx));

        let payload = ConditionPayload {
            merchants: vec![9],
            property_id: Some(4),
            property_values: vec!["blue".to_string()],
            count: Some(4),
            ..Default::default()
        };
        assert!(!MerchantCondition.check(&payload, &ctx));
        assert!(!PropertyCondition.check(&payload, &ctx));
        assert!(!DifferentProductsCountCondition.check(&payload, &ctx));
    }
}
