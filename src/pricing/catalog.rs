// Collaborator ports
//
// Read-only lookups the pricing core consumes. They are only awaited while the
// input model is being built; the calculation pipeline itself is synchronous.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::pricing::{
    config_store::{CategoryNode, PricingOptions},
    error::PricingResult,
    input::{Customer, ItemKind, ProductProperty},
    models::{Bonus, Discount, PromoCode},
    types::{BrandId, CategoryId, CustomerId, MerchantId, OfferId, PromoCodeId, PublicEventId},
};

/// Taxonomy attributes of the product behind an offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub offer_id: OfferId,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub merchant_id: Option<MerchantId>,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub public_event_id: Option<PublicEventId>,
    #[serde(default)]
    pub properties: Vec<ProductProperty>,
}

/// Current price of offers; offers without a price are absent from the map
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn prices(&self, offer_ids: &[OfferId]) -> PricingResult<HashMap<OfferId, Decimal>>;
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn products(&self, offer_ids: &[OfferId]) -> PricingResult<HashMap<OfferId, ProductInfo>>;
}

#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn customer(&self, customer_id: CustomerId) -> PricingResult<Option<Customer>>;
}

#[async_trait]
pub trait OrderLookup: Send + Sync {
    /// How many orders of the customer already used the promo code
    async fn promo_code_usage(
        &self,
        customer_id: CustomerId,
        promo_code_id: PromoCodeId,
    ) -> PricingResult<u32>;
}

/// Source of discounts, bonuses and promo codes
#[async_trait]
pub trait MarketingSource: Send + Sync {
    async fn discounts(&self) -> PricingResult<Vec<Discount>>;

    async fn bonuses(&self) -> PricingResult<Vec<Bonus>>;

    /// Finds a promo code by its text; uniqueness is the source's concern
    async fn promo_code(&self, code: &str) -> PricingResult<Option<PromoCode>>;
}

/// Source of the shared, rarely changing reference data
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn categories(&self) -> PricingResult<Vec<CategoryNode>>;

    async fn pricing_options(&self) -> PricingResult<Option<PricingOptions>>;
}

/// Every request-time collaborator the engine needs
#[derive(Clone)]
pub struct Collaborators {
    pub prices: Arc<dyn PriceLookup>,
    pub products: Arc<dyn ProductLookup>,
    pub customers: Arc<dyn CustomerLookup>,
    pub orders: Arc<dyn OrderLookup>,
    pub marketing: Arc<dyn MarketingSource>,
}

impl Collaborators {
    /// Uses one object for every port
    pub fn from_shared<T>(source: Arc<T>) -> Self
    where
        T: PriceLookup + ProductLookup + CustomerLookup + OrderLookup + MarketingSource + 'static,
    {
        Self {
            prices: source.clone(),
            products: source.clone(),
            customers: source.clone(),
            orders: source.clone(),
            marketing: source,
        }
    }
}
