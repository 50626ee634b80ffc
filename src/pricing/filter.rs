// Discount Filter and Sorter
//
// Filtering keeps the discounts that can apply to this basket and customer.
// Sorting orders the survivors by business precedence buckets, then by the
// amount each would yield on its own, then hoists max-priority discounts.

use rust_decimal::Decimal;

use crate::pricing::{
    appliers::applier_for,
    conditions::{ConditionContext, ConditionEvaluator, ConditionScope},
    config_store::CategoryTree,
    input::PricingInput,
    models::{scope_allows, Discount},
    types::DiscountType,
};

pub struct DiscountFilter;

impl DiscountFilter {
    pub fn filter(candidates: &[Discount], input: &PricingInput, categories: &CategoryTree) -> Vec<Discount> {
        candidates
            .iter()
            .filter(|discount| Self::passes(discount, input, categories))
            .cloned()
            .collect()
    }

    pub fn passes(discount: &Discount, input: &PricingInput, categories: &CategoryTree) -> bool {
        if discount.promo_code_only && !input.is_promo_discount(discount.id) {
            return false;
        }

        if applier_for(discount.discount_type)
            .targets(discount, input, categories)
            .is_empty()
        {
            tracing::debug!("Discount {} has no target in the basket", discount.id);
            return false;
        }

        if !scope_allows(&discount.roles, &input.customer.roles)
            || !scope_allows(&discount.segments, &input.customer.segments())
        {
            tracing::debug!("Discount {} not available to this customer", discount.id);
            return false;
        }

        let ctx = ConditionContext::new(input, categories);
        if !ConditionEvaluator::check_discount(discount, &ctx, ConditionScope::Generic) {
            tracing::debug!("Discount {} failed its conditions", discount.id);
            return false;
        }

        true
    }
}

/// Precedence bucket, earlier buckets are applied first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortBucket {
    Bundle,
    PromoCode,
    Catalog,
    PromoCodeOnly,
    Conditional,
    CartTotal,
    Delivery,
}

pub struct DiscountSorter;

impl DiscountSorter {
    pub fn bucket(discount: &Discount, input: &PricingInput) -> SortBucket {
        if discount.discount_type.is_bundle() {
            SortBucket::Bundle
        } else if input.is_promo_discount(discount.id) {
            SortBucket::PromoCode
        } else if discount.discount_type == DiscountType::Delivery {
            SortBucket::Delivery
        } else if discount.discount_type == DiscountType::CartTotal {
            SortBucket::CartTotal
        } else if discount.discount_type.is_catalog()
            && !discount.has_non_synergy_conditions()
            && !discount.promo_code_only
        {
            SortBucket::Catalog
        } else if discount.promo_code_only {
            SortBucket::PromoCodeOnly
        } else {
            SortBucket::Conditional
        }
    }

    /// Order discounts for sequential application
    ///
    /// Profit is measured by a dry run of each discount against the current
    /// prices; `input` is restored after every dry run.
    pub fn sort(discounts: Vec<Discount>, input: &mut PricingInput, categories: &CategoryTree) -> Vec<Discount> {
        let mut keyed: Vec<(SortBucket, Decimal, Discount)> = discounts
            .into_iter()
            .map(|discount| {
                let bucket = Self::bucket(&discount, input);
                let profit = applier_for(discount.discount_type).simulate(&discount, input, categories);
                (bucket, profit, discount)
            })
            .collect();

        // Stable: equal keys keep their fetch order
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

        let (mut sorted, rest): (Vec<Discount>, Vec<Discount>) = keyed
            .into_iter()
            .map(|(_, _, discount)| discount)
            .partition(|discount| discount.max_priority);
        sorted.extend(rest);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::input::{BasketItem, DeliveryOption};
    use crate::pricing::models::{ConditionGroup, ConditionPayload, DiscountCondition, ScopeRef};
    use crate::pricing::types::{ConditionType, LogicalOperator, ValueType};
    use rust_decimal_macros::dec;

    fn basket() -> PricingInput {
        let mut input = PricingInput::new(vec![BasketItem::new(1, 1, dec!(1000))]);
        input.customer.roles = vec![2];
        input
    }

    fn first_order_group() -> ConditionGroup {
        ConditionGroup::new(
            LogicalOperator::And,
            vec![DiscountCondition::new(ConditionType::FirstOrder, ConditionPayload::default())],
        )
    }

    #[test]
    fn test_filter_scope_roles_and_conditions() {
        let input = basket();
        let tree = CategoryTree::default();

        let mut wrong_offer = Discount::new(1, DiscountType::Offer, dec!(10), ValueType::Percent);
        wrong_offer.offers = vec![ScopeRef::include(2)];

        let mut wrong_role = Discount::new(2, DiscountType::AnyOffer, dec!(10), ValueType::Percent);
        wrong_role.roles = vec![ScopeRef::include(3)];

        let mut first_order = Discount::new(3, DiscountType::AnyOffer, dec!(10), ValueType::Percent);
        first_order.condition_groups = vec![first_order_group()];

        let kept = DiscountFilter::filter(&[wrong_offer, wrong_role, first_order], &input, &tree);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 3);
    }

    #[test]
    fn test_first_order_condition_after_an_order() {
        let mut input = basket();
        input.customer.orders_count = 1;
        let mut discount = Discount::new(3, DiscountType::AnyOffer, dec!(10), ValueType::Percent);
        discount.condition_groups = vec![first_order_group()];

        assert!(!DiscountFilter::passes(&discount, &input, &CategoryTree::default()));
    }

    #[test]
    fn test_bucket_assignment() {
        let mut input = basket();
        input.promo_discount_ids = vec![5];

        let bundle = Discount::new(1, DiscountType::BundleOffer, dec!(10), ValueType::Percent);
        let any_bundle = Discount::new(8, DiscountType::AnyBundle, dec!(10), ValueType::Percent);
        let pinned = Discount::new(5, DiscountType::CartTotal, dec!(10), ValueType::Percent);
        let catalog = Discount::new(2, DiscountType::Brand, dec!(10), ValueType::Percent);
        let mut promo_only = Discount::new(3, DiscountType::Brand, dec!(10), ValueType::Percent);
        promo_only.promo_code_only = true;
        let mut conditional = Discount::new(4, DiscountType::Brand, dec!(10), ValueType::Percent);
        conditional.condition_groups = vec![first_order_group()];
        let cart = Discount::new(6, DiscountType::CartTotal, dec!(10), ValueType::Percent);
        let delivery = Discount::new(7, DiscountType::Delivery, dec!(10), ValueType::Percent);

        assert_eq!(DiscountSorter::bucket(&bundle, &input), SortBucket::Bundle);
        assert_eq!(DiscountSorter::bucket(&any_bundle, &input), SortBucket::Bundle);
        assert_eq!(DiscountSorter::bucket(&pinned, &input), SortBucket::PromoCode);
        assert_eq!(DiscountSorter::bucket(&catalog, &input), SortBucket::Catalog);
        assert_eq!(DiscountSorter::bucket(&promo_only, &input), SortBucket::PromoCodeOnly);
        assert_eq!(DiscountSorter::bucket(&conditional, &input), SortBucket::Conditional);
        assert_eq!(DiscountSorter::bucket(&cart, &input), SortBucket::CartTotal);
        assert_eq!(DiscountSorter::bucket(&delivery, &input), SortBucket::Delivery);
    }

    #[test]
    fn test_sort_by_bucket_then_profit() {
        let mut input = basket();
        input.deliveries.items = vec![DeliveryOption::new(0, 1, dec!(100))];
        input.deliveries.current = Some(0);
        let tree = CategoryTree::default();
        let before = input.clone();

        let small = Discount::new(1, DiscountType::AnyOffer, dec!(5), ValueType::Percent);
        let large = Discount::new(2, DiscountType::AnyOffer, dec!(20), ValueType::Percent);
        let cart = Discount::new(3, DiscountType::CartTotal, dec!(500), ValueType::FixedAmount);
        let delivery = Discount::new(4, DiscountType::Delivery, dec!(100), ValueType::Percent);

        let sorted = DiscountSorter::sort(vec![delivery, cart, small, large], &mut input, &tree);
        let ids: Vec<i64> = sorted.iter().map(|d| d.id).collect();

        assert_eq!(ids, vec![2, 1, 3, 4]);
        assert_eq!(input, before);
    }

    #[test]
    fn test_max_priority_is_hoisted_stably() {
        let mut input = basket();
        let tree = CategoryTree::default();

        let first = Discount::new(1, DiscountType::AnyOffer, dec!(30), ValueType::Percent);
        let second = Discount::new(2, DiscountType::AnyOffer, dec!(20), ValueType::Percent);
        let mut low = Discount::new(3, DiscountType::AnyOffer, dec!(5), ValueType::Percent);
        low.max_priority = true;
        let mut cart = Discount::new(4, DiscountType::CartTotal, dec!(5), ValueType::Percent);
        cart.max_priority = true;

        let sorted = DiscountSorter::sort(vec![first, second, low, cart], &mut input, &tree);
        let ids: Vec<i64> = sorted.iter().map(|d| d.id).collect();

        assert_eq!(ids, vec![3, 4, 1, 2]);
    }
}
