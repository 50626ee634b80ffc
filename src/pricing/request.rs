// Request DTOs for the pricing boundary

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::pricing::{
    types::{BundleId, CustomerId, DeliveryMethodId, OfferId, PaymentMethod, RegionId, RoleId, SegmentId},
    validation::validate_non_negative_amount,
};

/// One line as sent by the storefront
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestedOffer {
    pub offer_id: OfferId,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub qty: u32,
    #[serde(default)]
    pub bundle_id: Option<BundleId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestedDelivery {
    pub method: DeliveryMethodId,
    #[validate(custom = "validate_non_negative_amount")]
    pub price: Decimal,
}

/// Request DTO for a basket calculation
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PricingRequest {
    pub customer_id: Option<CustomerId>,
    #[validate]
    pub offers: Vec<RequestedOffer>,
    #[validate]
    pub deliveries: Vec<RequestedDelivery>,
    /// Position in `deliveries` of the customer's pick
    pub selected_delivery: Option<usize>,
    pub payment: Option<PaymentMethod>,
    pub region_id: Option<RegionId>,
    #[validate(length(max = 64, message = "Promo code is too long"))]
    pub promo_code: Option<String>,
    #[validate(range(min = 0, message = "Bonus to spend must not be negative"))]
    pub bonus_to_spend: i64,
}

/// Request DTO for product-card prices
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CatalogRequest {
    #[validate(length(min = 1, message = "At least one offer is required"))]
    pub offer_ids: Vec<OfferId>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
    #[serde(default)]
    pub segment_id: Option<SegmentId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pricing_request_defaults() {
        let request: PricingRequest = serde_json::from_str(r#"{"offers": [{"offer_id": 1, "qty": 2}]}"#).unwrap();

        assert_eq!(request.offers[0].qty, 2);
        assert!(request.offers[0].bundle_id.is_none());
        assert_eq!(request.bonus_to_spend, 0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_pricing_request_validation() {
        let mut request = PricingRequest {
            offers: vec![RequestedOffer {
                offer_id: 1,
                qty: 0,
                bundle_id: None,
            }],
            ..Default::default()
        };
        assert!(request.validate().is_err());

        request.offers[0].qty = 1;
        request.deliveries = vec![RequestedDelivery {
            method: 1,
            price: dec!(-5),
        }];
        assert!(request.validate().is_err());

        request.deliveries[0].price = dec!(50);
        request.bonus_to_spend = -1;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_catalog_request_requires_offers() {
        let request = CatalogRequest {
            offer_ids: vec![],
            role_ids: vec![],
            segment_id: None,
        };
        assert!(request.validate().is_err());
    }
}
