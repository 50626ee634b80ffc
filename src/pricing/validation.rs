// Validation for marketing records and request fields
//
// Discount, bonus and promo code writes are checked here before they reach the
// store. Records that pass never fail a pricing run; the calculators assume a
// validated configuration.

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::pricing::{
    error::{PricingError, PricingResult},
    models::{Bonus, Discount, DiscountCondition, PromoCode, ScopeRef},
    types::{BonusType, ConditionType, DiscountType, PromoCodeType, ValueType},
};

/// Validates that a money amount is not negative
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// How one relation kind may be used by a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Forbidden,
    /// Only excepted rows
    ExceptOnly,
    Allowed,
    /// At least one included row
    Required,
}

#[derive(Debug, Clone, Copy)]
struct RelationRule {
    offers: Relation,
    brands: Relation,
    categories: Relation,
    bundles: Relation,
    public_events: Relation,
}

impl RelationRule {
    const NONE: RelationRule = RelationRule {
        offers: Relation::Forbidden,
        brands: Relation::Forbidden,
        categories: Relation::Forbidden,
        bundles: Relation::Forbidden,
        public_events: Relation::Forbidden,
    };
}

fn discount_relations(discount_type: DiscountType) -> RelationRule {
    use Relation::*;

    let base = RelationRule::NONE;
    match discount_type {
        DiscountType::Offer => RelationRule { offers: Required, ..base },
        DiscountType::AnyOffer => RelationRule { offers: ExceptOnly, ..base },
        DiscountType::Brand => RelationRule {
            offers: ExceptOnly,
            brands: Required,
            ..base
        },
        DiscountType::AnyBrand => RelationRule {
            offers: ExceptOnly,
            brands: ExceptOnly,
            ..base
        },
        DiscountType::Category => RelationRule {
            offers: ExceptOnly,
            categories: Required,
            ..base
        },
        DiscountType::AnyCategory => RelationRule {
            offers: ExceptOnly,
            categories: ExceptOnly,
            ..base
        },
        DiscountType::BundleOffer | DiscountType::BundleMasterclass => {
            RelationRule { bundles: Required, ..base }
        }
        DiscountType::AnyBundle => RelationRule { bundles: ExceptOnly, ..base },
        DiscountType::Delivery => base,
        DiscountType::CartTotal => RelationRule {
            offers: ExceptOnly,
            brands: ExceptOnly,
            categories: ExceptOnly,
            ..base
        },
        DiscountType::Masterclass => RelationRule {
            offers: Allowed,
            public_events: Allowed,
            ..base
        },
        DiscountType::AnyMasterclass => RelationRule {
            offers: ExceptOnly,
            public_events: ExceptOnly,
            ..base
        },
    }
}

fn bonus_relations(bonus_type: BonusType) -> RelationRule {
    use Relation::*;

    let base = RelationRule::NONE;
    match bonus_type {
        BonusType::Offer => RelationRule { offers: Required, ..base },
        BonusType::AnyOffer => RelationRule { offers: ExceptOnly, ..base },
        BonusType::Brand => RelationRule {
            offers: ExceptOnly,
            brands: Required,
            ..base
        },
        BonusType::AnyBrand => RelationRule {
            offers: ExceptOnly,
            brands: ExceptOnly,
            ..base
        },
        BonusType::Category => RelationRule {
            offers: ExceptOnly,
            categories: Required,
            ..base
        },
        BonusType::AnyCategory => RelationRule {
            offers: ExceptOnly,
            categories: ExceptOnly,
            ..base
        },
        BonusType::Service => RelationRule {
            offers: ExceptOnly,
            public_events: Allowed,
            ..base
        },
        BonusType::CartTotal => base,
    }
}

fn check_relation<T>(name: &str, refs: &[ScopeRef<T>], relation: Relation) -> Result<(), String> {
    let included = refs.iter().filter(|r| !r.except).count();
    match relation {
        Relation::Forbidden if !refs.is_empty() => Err(format!("{} are not allowed for this type", name)),
        Relation::ExceptOnly if included > 0 => Err(format!("{} may only be excepted for this type", name)),
        Relation::Required if included == 0 => Err(format!("at least one {} entry is required", name)),
        _ => Ok(()),
    }
}

fn check_value(value: Decimal, value_type: ValueType) -> Result<(), String> {
    if value <= Decimal::ZERO {
        return Err("value must be positive".to_string());
    }
    if value_type == ValueType::Percent && value > Decimal::ONE_HUNDRED {
        return Err("percent value must not exceed 100".to_string());
    }
    Ok(())
}

fn check_dates<T: PartialOrd>(start: &Option<T>, end: &Option<T>) -> Result<(), String> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err("start date is after end date".to_string()),
        _ => Ok(()),
    }
}

fn check_condition(owner: &Discount, condition: &DiscountCondition) -> Result<(), String> {
    let payload = &condition.payload;
    let missing = |field: &str| -> Result<(), String> {
        Err(format!("{} condition requires {}", condition.condition_type, field))
    };

    match condition.condition_type {
        ConditionType::FirstOrder | ConditionType::Bundle => Ok(()),
        ConditionType::MinPriceOrder if payload.min_price.is_none() => missing("minPrice"),
        ConditionType::MinPriceBrand if payload.min_price.is_none() || payload.brands.is_empty() => {
            missing("minPrice and brands")
        }
        ConditionType::MinPriceCategory
            if payload.min_price.is_none() || payload.categories.is_empty() =>
        {
            missing("minPrice and categories")
        }
        ConditionType::EveryUnitProduct if payload.offer.is_none() || payload.count.is_none() => {
            missing("offer and count")
        }
        ConditionType::DeliveryMethod if payload.delivery_methods.is_empty() => missing("deliveryMethods"),
        ConditionType::PayMethod if payload.payment_methods.is_empty() => missing("paymentMethods"),
        ConditionType::Region if payload.regions.is_empty() => missing("regions"),
        ConditionType::Customer if payload.customer_ids.is_empty() => missing("customerIds"),
        ConditionType::OrderSequenceNumber if payload.count.unwrap_or(0) == 0 => missing("a positive count"),
        ConditionType::Merchant if payload.merchants.is_empty() => missing("merchants"),
        ConditionType::Property if payload.property_id.is_none() => missing("propertyId"),
        ConditionType::DifferentProductsCount if payload.count.is_none() => missing("count"),
        ConditionType::DiscountSynergy => {
            if payload.synergy.contains(&owner.id) {
                return Err("a discount cannot list itself in its synergy".to_string());
            }
            match (payload.max_value, payload.max_value_type) {
                (Some(max), value_type) => check_value(max, value_type.unwrap_or(ValueType::FixedAmount))
                    .map_err(|e| format!("synergy max {}", e)),
                (None, Some(_)) => missing("maxValue alongside maxValueType"),
                (None, None) => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

pub struct DiscountValidator;

impl DiscountValidator {
    pub fn validate(discount: &Discount) -> PricingResult<()> {
        Self::check(discount).map_err(|reason| {
            tracing::debug!("Discount {} rejected: {}", discount.id, reason);
            PricingError::InvalidDiscount(format!("discount {}: {}", discount.id, reason))
        })
    }

    fn check(discount: &Discount) -> Result<(), String> {
        check_value(discount.value, discount.value_type)?;
        check_dates(&discount.start_date, &discount.end_date)?;

        if discount.product_qty_limit == Some(0) {
            return Err("product_qty_limit must be positive".to_string());
        }

        let rule = discount_relations(discount.discount_type);
        check_relation("offers", &discount.offers, rule.offers)?;
        check_relation("brands", &discount.brands, rule.brands)?;
        check_relation("categories", &discount.categories, rule.categories)?;
        check_relation("bundles", &discount.bundles, rule.bundles)?;
        check_relation("public events", &discount.public_events, rule.public_events)?;

        if discount.discount_type.lists_bundle_items() && discount.bundle_items.is_empty() {
            return Err("bundle discounts require bundle items".to_string());
        }
        if !discount.discount_type.lists_bundle_items() && !discount.bundle_items.is_empty() {
            return Err("bundle items are only allowed for bundle discounts".to_string());
        }
        if discount.discount_type == DiscountType::Masterclass
            && discount.offers.iter().all(|r| r.except)
            && discount.public_events.iter().all(|r| r.except)
        {
            return Err("masterclass discounts require an offer or a public event".to_string());
        }

        for condition in discount.conditions() {
            check_condition(discount, condition)?;
        }
        Ok(())
    }
}

pub struct BonusValidator;

impl BonusValidator {
    pub fn validate(bonus: &Bonus) -> PricingResult<()> {
        Self::check(bonus)
            .map_err(|reason| PricingError::InvalidBonus(format!("bonus {}: {}", bonus.id, reason)))
    }

    fn check(bonus: &Bonus) -> Result<(), String> {
        check_value(bonus.value, bonus.value_type)?;
        check_dates(&bonus.start_date, &bonus.end_date)?;

        let rule = bonus_relations(bonus.bonus_type);
        check_relation("offers", &bonus.offers, rule.offers)?;
        check_relation("brands", &bonus.brands, rule.brands)?;
        check_relation("categories", &bonus.categories, rule.categories)?;
        check_relation("public events", &bonus.public_events, rule.public_events)
    }
}

pub struct PromoCodeValidator;

impl PromoCodeValidator {
    pub fn validate(promo: &PromoCode) -> PricingResult<()> {
        Self::check(promo)
            .map_err(|reason| PricingError::InvalidPromoCode(format!("promo code {}: {}", promo.id, reason)))
    }

    fn check(promo: &PromoCode) -> Result<(), String> {
        if promo.code.trim().is_empty() || promo.code.chars().any(char::is_whitespace) {
            return Err("code must be a single non-empty word".to_string());
        }
        check_dates(&promo.start_date, &promo.end_date)?;
        if promo.counter == Some(0) {
            return Err("counter must be positive".to_string());
        }

        let targets = (
            promo.discount_id.is_some(),
            promo.bonus_id.is_some(),
            promo.gift_id.is_some(),
        );
        let expected = match promo.promo_type {
            PromoCodeType::Discount => (true, false, false),
            PromoCodeType::Bonus => (false, true, false),
            PromoCodeType::Gift => (false, false, true),
            PromoCodeType::Delivery => (false, false, false),
        };
        if targets != expected {
            return Err(format!("{:?} codes must reference exactly their own target", promo.promo_type));
        }
        Ok(())
    }
}
