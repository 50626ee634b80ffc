// Condition Evaluator
//
// Tests discount conditions against the pricing input. Each condition kind has
// its own checker; condition groups combine checker results with the group's
// logical operator, and a discount passes when every group passes.

mod checkers;

pub use checkers::*;

use crate::pricing::{
    config_store::CategoryTree,
    input::PricingInput,
    models::{ConditionGroup, ConditionPayload, Discount, DiscountCondition},
    types::{ConditionType, LogicalOperator},
};

/// Read-only view a checker evaluates against
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    pub input: &'a PricingInput,
    pub categories: &'a CategoryTree,
}

impl<'a> ConditionContext<'a> {
    pub fn new(input: &'a PricingInput, categories: &'a CategoryTree) -> Self {
        Self { input, categories }
    }
}

/// One predicate over the pricing input
///
/// Checkers never fail: missing payload fields or missing request data make
/// the condition false.
pub trait ConditionChecker: Send + Sync {
    fn condition_type(&self) -> ConditionType;

    fn check(&self, payload: &ConditionPayload, ctx: &ConditionContext<'_>) -> bool;
}

/// Checker registered for a condition kind
pub fn checker_for(condition_type: ConditionType) -> &'static dyn ConditionChecker {
    match condition_type {
        ConditionType::FirstOrder => &FirstOrderCondition,
        ConditionType::MinPriceOrder => &MinPriceOrderCondition,
        ConditionType::MinPriceBrand => &MinPriceBrandCondition,
        ConditionType::MinPriceCategory => &MinPriceCategoryCondition,
        ConditionType::EveryUnitProduct => &EveryUnitProductCondition,
        ConditionType::DeliveryMethod => &DeliveryMethodCondition,
        ConditionType::PayMethod => &PayMethodCondition,
        ConditionType::Region => &RegionCondition,
        ConditionType::Customer => &CustomerCondition,
        ConditionType::OrderSequenceNumber => &OrderSequenceNumberCondition,
        ConditionType::DiscountSynergy => &DiscountSynergyCondition,
        ConditionType::Bundle => &BundleCondition,
        ConditionType::Merchant => &MerchantCondition,
        ConditionType::Property => &PropertyCondition,
        ConditionType::DifferentProductsCount => &DifferentProductsCountCondition,
    }
}

/// Which conditions of a group take part in an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionScope {
    /// Everything except delivery-method and synergy conditions
    Generic,
    /// Only delivery-method conditions, checked against the current delivery
    DeliveryOnly,
}

impl ConditionScope {
    fn includes(&self, condition_type: ConditionType) -> bool {
        match self {
            ConditionScope::Generic => !condition_type.is_deferred(),
            ConditionScope::DeliveryOnly => condition_type == ConditionType::DeliveryMethod,
        }
    }
}

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn check(condition: &DiscountCondition, ctx: &ConditionContext<'_>) -> bool {
        checker_for(condition.condition_type).check(&condition.payload, ctx)
    }

    /// Evaluate one group within a scope
    ///
    /// A group with no condition in scope passes.
    pub fn check_group(
        group: &ConditionGroup,
        ctx: &ConditionContext<'_>,
        scope: ConditionScope,
    ) -> bool {
        let results: Vec<bool> = group
            .conditions
            .iter()
            .filter(|c| scope.includes(c.condition_type))
            .map(|c| Self::check(c, ctx))
            .collect();

        combine(group.logical_operator, &results)
    }

    /// Groups are ANDed together
    pub fn check_discount(
        discount: &Discount,
        ctx: &ConditionContext<'_>,
        scope: ConditionScope,
    ) -> bool {
        discount
            .condition_groups
            .iter()
            .all(|group| Self::check_group(group, ctx, scope))
    }
}

fn combine(operator: LogicalOperator, results: &[bool]) -> bool {
    if results.is_empty() {
        return true;
    }
    match operator {
        LogicalOperator::None => false,
        LogicalOperator::And => results.iter().all(|r| *r),
        LogicalOperator::Or => results.iter().any(|r| *r),
        LogicalOperator::AndNot => results.iter().all(|r| !*r),
        LogicalOperator::OrNot => results.iter().any(|r| !*r),
    }
}
