// Marketing records consumed by the calculators
//
// Discounts, their condition groups, bonus rules and promo codes, as loaded from
// the marketing source. All of them are read-only during a pricing run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::types::{
    BonusId, BonusType, BrandId, BundleId, CategoryId, ConditionType, CustomerId,
    DeliveryMethodId, DiscountId, DiscountType, LogicalOperator, MerchantId, OfferId,
    PaymentMethod, PromoCodeId, PromoCodeType, PropertyId, PublicEventId, RecordStatus,
    RegionId, RoleId, SegmentId, ValueType,
};

/// Reference from a discount to one scoped entity
///
/// With `except` set the discount applies to everything of that kind except
/// this entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRef<T> {
    pub id: T,
    #[serde(default)]
    pub except: bool,
}

impl<T> ScopeRef<T> {
    pub fn include(id: T) -> Self {
        Self { id, except: false }
    }

    pub fn except(id: T) -> Self {
        Self { id, except: true }
    }
}

/// Ids of the non-excepted references
pub fn included<T: Copy>(refs: &[ScopeRef<T>]) -> impl Iterator<Item = T> + '_ {
    refs.iter().filter(|r| !r.except).map(|r| r.id)
}

/// Ids of the excepted references
pub fn excepted<T: Copy>(refs: &[ScopeRef<T>]) -> impl Iterator<Item = T> + '_ {
    refs.iter().filter(|r| r.except).map(|r| r.id)
}

/// Allow-list check used for roles and segments
///
/// Passes when nothing is listed, fails when the value is excepted, and
/// otherwise requires the value among the included ids if any are included.
pub fn scope_allows<T: Copy + PartialEq>(refs: &[ScopeRef<T>], values: &[T]) -> bool {
    if refs.is_empty() {
        return true;
    }
    if excepted(refs).any(|id| values.contains(&id)) {
        return false;
    }
    let mut wanted = included(refs).peekable();
    if wanted.peek().is_none() {
        return true;
    }
    wanted.any(|id| values.contains(&id))
}

/// Payload of a discount condition, keyed by field name
///
/// Each condition kind reads only the fields it needs. A missing field makes
/// the condition fail rather than error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionPayload {
    pub min_price: Option<Decimal>,
    pub brands: Vec<BrandId>,
    pub categories: Vec<CategoryId>,
    pub offer: Option<OfferId>,
    pub count: Option<u32>,
    pub delivery_methods: Vec<DeliveryMethodId>,
    pub payment_methods: Vec<PaymentMethod>,
    pub regions: Vec<RegionId>,
    pub customer_ids: Vec<CustomerId>,
    pub synergy: Vec<DiscountId>,
    pub max_value_type: Option<ValueType>,
    pub max_value: Option<Decimal>,
    pub merchants: Vec<MerchantId>,
    pub property_id: Option<PropertyId>,
    pub property_values: Vec<String>,
}

/// One predicate attached to a condition group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    #[serde(default)]
    pub payload: ConditionPayload,
}

impl DiscountCondition {
    pub fn new(condition_type: ConditionType, payload: ConditionPayload) -> Self {
        Self {
            condition_type,
            payload,
        }
    }

    pub fn synergy(ids: Vec<DiscountId>) -> Self {
        Self::new(
            ConditionType::DiscountSynergy,
            ConditionPayload {
                synergy: ids,
                ..Default::default()
            },
        )
    }
}

/// Conditions combined with a logical operator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub logical_operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<DiscountCondition>,
}

impl ConditionGroup {
    pub fn new(logical_operator: LogicalOperator, conditions: Vec<DiscountCondition>) -> Self {
        Self {
            logical_operator,
            conditions,
        }
    }
}

/// A rule that changes price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub value_type: ValueType,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub promo_code_only: bool,
    #[serde(default)]
    pub summarizable_with_all: bool,
    #[serde(default)]
    pub max_priority: bool,
    #[serde(default)]
    pub merchant_id: Option<MerchantId>,
    #[serde(default)]
    pub product_qty_limit: Option<u32>,
    #[serde(default)]
    pub offers: Vec<ScopeRef<OfferId>>,
    #[serde(default)]
    pub brands: Vec<ScopeRef<BrandId>>,
    #[serde(default)]
    pub categories: Vec<ScopeRef<CategoryId>>,
    #[serde(default)]
    pub segments: Vec<ScopeRef<SegmentId>>,
    #[serde(default)]
    pub roles: Vec<ScopeRef<RoleId>>,
    #[serde(default)]
    pub bundles: Vec<ScopeRef<BundleId>>,
    /// Offers making up the bundle, for bundle discount types
    #[serde(default)]
    pub bundle_items: Vec<OfferId>,
    #[serde(default)]
    pub public_events: Vec<ScopeRef<PublicEventId>>,
    #[serde(default)]
    pub condition_groups: Vec<ConditionGroup>,
}

impl Discount {
    /// Minimal active discount, mostly used to build fixtures
    pub fn new(id: DiscountId, discount_type: DiscountType, value: Decimal, value_type: ValueType) -> Self {
        Self {
            id,
            name: String::new(),
            discount_type,
            value,
            value_type,
            status: RecordStatus::Active,
            start_date: None,
            end_date: None,
            promo_code_only: false,
            summarizable_with_all: false,
            max_priority: false,
            merchant_id: None,
            product_qty_limit: None,
            offers: Vec::new(),
            brands: Vec::new(),
            categories: Vec::new(),
            segments: Vec::new(),
            roles: Vec::new(),
            bundles: Vec::new(),
            bundle_items: Vec::new(),
            public_events: Vec::new(),
            condition_groups: Vec::new(),
        }
    }

    /// Active status and inside the validity window (open bounds allowed)
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        is_active_window(self.status, self.start_date, self.end_date, now)
    }

    pub fn conditions(&self) -> impl Iterator<Item = &DiscountCondition> {
        self.condition_groups.iter().flat_map(|g| g.conditions.iter())
    }

    pub fn has_condition(&self, condition_type: ConditionType) -> bool {
        self.conditions().any(|c| c.condition_type == condition_type)
    }

    pub fn has_non_synergy_conditions(&self) -> bool {
        self.conditions()
            .any(|c| c.condition_type != ConditionType::DiscountSynergy)
    }

    /// Union of every synergy list attached to this discount
    pub fn synergy_ids(&self) -> Vec<DiscountId> {
        let mut ids: Vec<DiscountId> = self
            .conditions()
            .filter(|c| c.condition_type == ConditionType::DiscountSynergy)
            .flat_map(|c| c.payload.synergy.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn synergy_condition(&self) -> Option<&DiscountCondition> {
        self.conditions()
            .find(|c| c.condition_type == ConditionType::DiscountSynergy)
    }

    pub fn synergy_condition_mut(&mut self) -> Option<&mut DiscountCondition> {
        self.condition_groups
            .iter_mut()
            .flat_map(|g| g.conditions.iter_mut())
            .find(|c| c.condition_type == ConditionType::DiscountSynergy)
    }

    pub fn condition_types(&self) -> Vec<ConditionType> {
        let mut types: Vec<ConditionType> = Vec::new();
        for condition in self.conditions() {
            if !types.contains(&condition.condition_type) {
                types.push(condition.condition_type);
            }
        }
        types
    }
}

/// Loyalty-point rule, structurally parallel to a discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub id: BonusId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub bonus_type: BonusType,
    pub value: Decimal,
    pub value_type: ValueType,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub promo_code_only: bool,
    #[serde(default)]
    pub offers: Vec<ScopeRef<OfferId>>,
    #[serde(default)]
    pub brands: Vec<ScopeRef<BrandId>>,
    #[serde(default)]
    pub categories: Vec<ScopeRef<CategoryId>>,
    #[serde(default)]
    pub public_events: Vec<ScopeRef<PublicEventId>>,
}

impl Bonus {
    pub fn new(id: BonusId, bonus_type: BonusType, value: Decimal, value_type: ValueType) -> Self {
        Self {
            id,
            name: String::new(),
            bonus_type,
            value,
            value_type,
            status: RecordStatus::Active,
            start_date: None,
            end_date: None,
            promo_code_only: false,
            offers: Vec::new(),
            brands: Vec::new(),
            categories: Vec::new(),
            public_events: Vec::new(),
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        is_active_window(self.status, self.start_date, self.end_date, now)
    }
}

/// Who may redeem a promo code; empty lists are unrestricted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoCodeConditions {
    pub customer_ids: Vec<CustomerId>,
    pub segment_ids: Vec<SegmentId>,
    pub role_ids: Vec<RoleId>,
}

/// Textual code bound to a discount, a bonus, a gift or free delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: PromoCodeId,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub promo_type: PromoCodeType,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Redemptions allowed per customer; `None` is unlimited
    #[serde(default)]
    pub counter: Option<u32>,
    #[serde(default)]
    pub discount_id: Option<DiscountId>,
    #[serde(default)]
    pub bonus_id: Option<BonusId>,
    #[serde(default)]
    pub gift_id: Option<i64>,
    #[serde(default)]
    pub conditions: PromoCodeConditions,
}

impl PromoCode {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        is_active_window(self.status, self.start_date, self.end_date, now)
    }
}

fn is_active_window(
    status: RecordStatus,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if status != RecordStatus::Active {
        return false;
    }
    if let Some(start) = start {
        if now < start {
            return false;
        }
    }
    if let Some(end) = end {
        if now > end {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_scope_allows_empty_list() {
        let refs: Vec<ScopeRef<RoleId>> = vec![];
        assert!(scope_allows(&refs, &[1]));
        assert!(scope_allows(&refs, &[]));
    }

    #[test]
    fn test_scope_allows_included_and_excepted() {
        let refs = vec![ScopeRef::include(1), ScopeRef::include(2)];
        assert!(scope_allows(&refs, &[2, 5]));
        assert!(!scope_allows(&refs, &[5]));

        let refs = vec![ScopeRef::except(3)];
        assert!(scope_allows(&refs, &[1]));
        assert!(!scope_allows(&refs, &[3]));
    }

    #[test]
    fn test_discount_active_window() {
        let now = Utc::now();
        let mut discount = Discount::new(1, DiscountType::Offer, dec!(10), ValueType::Percent);
        assert!(discount.is_active_at(now));

        discount.start_date = Some(now + Duration::days(1));
        assert!(!discount.is_active_at(now));

        discount.start_date = Some(now - Duration::days(2));
        discount.end_date = Some(now - Duration::days(1));
        assert!(!discount.is_active_at(now));

        discount.end_date = None;
        discount.status = RecordStatus::Paused;
        assert!(!discount.is_active_at(now));
    }

    #[test]
    fn test_synergy_ids_union() {
        let mut discount = Discount::new(1, DiscountType::Offer, dec!(10), ValueType::Percent);
        discount.condition_groups = vec![
            ConditionGroup::new(LogicalOperator::And, vec![DiscountCondition::synergy(vec![3, 2])]),
            ConditionGroup::new(LogicalOperator::And, vec![DiscountCondition::synergy(vec![2, 4])]),
        ];

        assert_eq!(discount.synergy_ids(), vec![2, 3, 4]);
        assert!(!discount.has_non_synergy_conditions());
    }

    #[test]
    fn test_condition_payload_deserialization() {
        let json = r#"{"type": "min_price_brand", "payload": {"minPrice": 500, "brands": [1, 2]}}"#;
        let condition: DiscountCondition = serde_json::from_str(json).unwrap();

        assert_eq!(condition.condition_type, ConditionType::MinPriceBrand);
        assert_eq!(condition.payload.min_price, Some(dec!(500)));
        assert_eq!(condition.payload.brands, vec![1, 2]);
        assert!(condition.payload.categories.is_empty());
    }
}
