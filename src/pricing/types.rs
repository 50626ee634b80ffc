// Domain type definitions for the pricing engine
// Shared enums used by discounts, bonuses, promo codes and the calculators

use serde::{Deserialize, Serialize};
use std::fmt;

pub type OfferId = i64;
pub type DiscountId = i64;
pub type BonusId = i64;
pub type PromoCodeId = i64;
pub type BrandId = i64;
pub type CategoryId = i64;
pub type MerchantId = i64;
pub type CustomerId = i64;
pub type RoleId = i64;
pub type SegmentId = i64;
pub type BundleId = i64;
pub type PublicEventId = i64;
pub type RegionId = i64;
pub type DeliveryMethodId = i64;
pub type PropertyId = i64;

/// Kind of target a discount is aimed at
///
/// `Any*` variants apply to every eligible line of that kind, minus the
/// excepted ids of the discount's relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Offer,
    AnyOffer,
    Brand,
    AnyBrand,
    Category,
    AnyCategory,
    BundleOffer,
    BundleMasterclass,
    AnyBundle,
    Delivery,
    CartTotal,
    Masterclass,
    AnyMasterclass,
}

impl DiscountType {
    pub const ALL: [DiscountType; 13] = [
        DiscountType::Offer,
        DiscountType::AnyOffer,
        DiscountType::Brand,
        DiscountType::AnyBrand,
        DiscountType::Category,
        DiscountType::AnyCategory,
        DiscountType::BundleOffer,
        DiscountType::BundleMasterclass,
        DiscountType::AnyBundle,
        DiscountType::Delivery,
        DiscountType::CartTotal,
        DiscountType::Masterclass,
        DiscountType::AnyMasterclass,
    ];

    /// Types that can be priced on a product card, outside of a basket
    pub const CATALOG: [DiscountType; 8] = [
        DiscountType::Offer,
        DiscountType::AnyOffer,
        DiscountType::Brand,
        DiscountType::AnyBrand,
        DiscountType::Category,
        DiscountType::AnyCategory,
        DiscountType::Masterclass,
        DiscountType::AnyMasterclass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Offer => "offer",
            DiscountType::AnyOffer => "any_offer",
            DiscountType::Brand => "brand",
            DiscountType::AnyBrand => "any_brand",
            DiscountType::Category => "category",
            DiscountType::AnyCategory => "any_category",
            DiscountType::BundleOffer => "bundle_offer",
            DiscountType::BundleMasterclass => "bundle_masterclass",
            DiscountType::AnyBundle => "any_bundle",
            DiscountType::Delivery => "delivery",
            DiscountType::CartTotal => "cart_total",
            DiscountType::Masterclass => "masterclass",
            DiscountType::AnyMasterclass => "any_masterclass",
        }
    }

    /// Types aimed at bundled lines
    pub fn is_bundle(&self) -> bool {
        matches!(
            self,
            DiscountType::BundleOffer | DiscountType::BundleMasterclass | DiscountType::AnyBundle
        )
    }

    /// Bundle types that name their own bundle items
    pub fn lists_bundle_items(&self) -> bool {
        matches!(self, DiscountType::BundleOffer | DiscountType::BundleMasterclass)
    }

    pub fn is_catalog(&self) -> bool {
        Self::CATALOG.contains(self)
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiscountType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid discount type: {}", s))
    }
}

/// How a discount or bonus value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Value is a percentage of the base (e.g., 10 = 10% off)
    Percent,

    /// Value is a fixed amount in currency units
    FixedAmount,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Percent => write!(f, "percent"),
            ValueType::FixedAmount => write!(f, "fixed_amount"),
        }
    }
}

/// Lifecycle status of a discount, bonus or promo code record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Created,
    #[default]
    Active,
    Paused,
    Expired,
}

/// Kind of predicate a discount condition tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    FirstOrder,
    MinPriceOrder,
    MinPriceBrand,
    MinPriceCategory,
    EveryUnitProduct,
    DeliveryMethod,
    PayMethod,
    Region,
    Customer,
    OrderSequenceNumber,
    DiscountSynergy,
    Bundle,
    Merchant,
    Property,
    DifferentProductsCount,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::FirstOrder => "first_order",
            ConditionType::MinPriceOrder => "min_price_order",
            ConditionType::MinPriceBrand => "min_price_brand",
            ConditionType::MinPriceCategory => "min_price_category",
            ConditionType::EveryUnitProduct => "every_unit_product",
            ConditionType::DeliveryMethod => "delivery_method",
            ConditionType::PayMethod => "pay_method",
            ConditionType::Region => "region",
            ConditionType::Customer => "customer",
            ConditionType::OrderSequenceNumber => "order_sequence_number",
            ConditionType::DiscountSynergy => "discount_synergy",
            ConditionType::Bundle => "bundle",
            ConditionType::Merchant => "merchant",
            ConditionType::Property => "property",
            ConditionType::DifferentProductsCount => "different_products_count",
        }
    }

    /// Conditions evaluated outside the generic filtering pass
    pub fn is_deferred(&self) -> bool {
        matches!(self, ConditionType::DeliveryMethod | ConditionType::DiscountSynergy)
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator combining the results of a condition group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    /// Passes only when the group has no conditions
    #[default]
    None,
    And,
    Or,
    AndNot,
    OrNot,
}

/// Kind of target a bonus (loyalty points) rule is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusType {
    Offer,
    AnyOffer,
    Brand,
    AnyBrand,
    Category,
    AnyCategory,
    Service,
    CartTotal,
}

impl BonusType {
    pub fn is_catalog(&self) -> bool {
        !matches!(self, BonusType::CartTotal)
    }
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BonusType::Offer => "offer",
            BonusType::AnyOffer => "any_offer",
            BonusType::Brand => "brand",
            BonusType::AnyBrand => "any_brand",
            BonusType::Category => "category",
            BonusType::AnyCategory => "any_category",
            BonusType::Service => "service",
            BonusType::CartTotal => "cart_total",
        };
        f.write_str(s)
    }
}

/// What a promo code grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoCodeType {
    Discount,
    Delivery,
    Bonus,
    Gift,
}

/// Outcome of a resolved promo code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoCodeOutcome {
    /// The code changed the price or the bonus accrual
    Applied,

    /// The code is valid but had no effect on this basket
    NotApplied,
}

/// Payment method selected at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
    Credit,
    Installment,
}

impl PaymentMethod {
    /// Deferred payment methods neither earn nor spend loyalty points
    pub fn is_deferred(&self) -> bool {
        matches!(self, PaymentMethod::Credit | PaymentMethod::Installment)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Installment => "installment",
        };
        f.write_str(s)
    }
}
