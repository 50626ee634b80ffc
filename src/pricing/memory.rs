// In-memory catalog
//
// JSON-seeded implementation of every collaborator port. Writes go through the
// record validators, and discount writes are mirrored by the synergy linker.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use crate::pricing::{
    catalog::{
        CustomerLookup, MarketingSource, OrderLookup, PriceLookup, ProductInfo, ProductLookup,
        ReferenceSource,
    },
    config_store::{CategoryNode, PricingOptions},
    error::{PricingError, PricingResult},
    input::Customer,
    models::{Bonus, Discount, PromoCode},
    synergy::SynergyLinker,
    types::{CustomerId, DiscountId, OfferId, PromoCodeId},
    validation::{BonusValidator, DiscountValidator, PromoCodeValidator},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferPrice {
    pub offer_id: OfferId,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCodeUsage {
    pub customer_id: CustomerId,
    pub promo_code_id: PromoCodeId,
    pub count: u32,
}

/// Serialized form of the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    pub prices: Vec<OfferPrice>,
    pub products: Vec<ProductInfo>,
    pub customers: Vec<Customer>,
    pub promo_code_usage: Vec<PromoCodeUsage>,
    pub discounts: Vec<Discount>,
    pub bonuses: Vec<Bonus>,
    pub promo_codes: Vec<PromoCode>,
    pub categories: Vec<CategoryNode>,
    pub options: Option<PricingOptions>,
}

#[derive(Debug, Default)]
struct CatalogState {
    prices: HashMap<OfferId, Decimal>,
    products: HashMap<OfferId, ProductInfo>,
    customers: HashMap<CustomerId, Customer>,
    usage: HashMap<(CustomerId, PromoCodeId), u32>,
    discounts: HashMap<DiscountId, Discount>,
    bonuses: Vec<Bonus>,
    promo_codes: Vec<PromoCode>,
    categories: Vec<CategoryNode>,
    options: Option<PricingOptions>,
}

pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
        }
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a snapshot, validating every marketing record
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> PricingResult<Self> {
        for discount in &snapshot.discounts {
            DiscountValidator::validate(discount)?;
        }
        for bonus in &snapshot.bonuses {
            BonusValidator::validate(bonus)?;
        }
        for promo in &snapshot.promo_codes {
            PromoCodeValidator::validate(promo)?;
        }
        if let Some(options) = &snapshot.options {
            options.validate()?;
        }

        let mut discounts: HashMap<DiscountId, Discount> =
            snapshot.discounts.into_iter().map(|d| (d.id, d)).collect();
        let ids: Vec<DiscountId> = discounts.keys().copied().collect();
        for id in ids {
            SynergyLinker::link(&mut discounts, id, &[])?;
        }

        let state = CatalogState {
            prices: snapshot.prices.into_iter().map(|p| (p.offer_id, p.price)).collect(),
            products: snapshot.products.into_iter().map(|p| (p.offer_id, p)).collect(),
            customers: snapshot
                .customers
                .into_iter()
                .filter_map(|c| c.id.map(|id| (id, c)))
                .collect(),
            usage: snapshot
                .promo_code_usage
                .into_iter()
                .map(|u| ((u.customer_id, u.promo_code_id), u.count))
                .collect(),
            discounts,
            bonuses: snapshot.bonuses,
            promo_codes: snapshot.promo_codes,
            categories: snapshot.categories,
            options: snapshot.options,
        };

        tracing::info!(
            "Catalog loaded: {} prices, {} discounts, {} bonuses, {} promo codes",
            state.prices.len(),
            state.discounts.len(),
            state.bonuses.len(),
            state.promo_codes.len()
        );
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub fn from_json(json: &str) -> PricingResult<Self> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> PricingResult<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub async fn set_price(&self, offer_id: OfferId, price: Decimal) {
        self.state.write().await.prices.insert(offer_id, price);
    }

    pub async fn upsert_product(&self, product: ProductInfo) {
        self.state.write().await.products.insert(product.offer_id, product);
    }

    pub async fn upsert_customer(&self, customer: Customer) -> PricingResult<()> {
        let id = customer
            .id
            .ok_or_else(|| PricingError::ValidationError("customer id is required".to_string()))?;
        self.state.write().await.customers.insert(id, customer);
        Ok(())
    }

    pub async fn record_promo_code_usage(&self, customer_id: CustomerId, promo_code_id: PromoCodeId) {
        *self
            .state
            .write()
            .await
            .usage
            .entry((customer_id, promo_code_id))
            .or_insert(0) += 1;
    }

    /// Create or replace a discount and mirror its synergy links
    pub async fn upsert_discount(&self, discount: Discount) -> PricingResult<()> {
        DiscountValidator::validate(&discount)?;

        let mut state = self.state.write().await;
        let id = discount.id;
        let replaced = state.discounts.insert(id, discount);
        let previous = replaced.as_ref().map(Discount::synergy_ids).unwrap_or_default();

        if let Err(err) = SynergyLinker::link(&mut state.discounts, id, &previous) {
            match replaced {
                Some(old) => state.discounts.insert(id, old),
                None => state.discounts.remove(&id),
            };
            return Err(err);
        }
        Ok(())
    }

    pub async fn remove_discount(&self, id: DiscountId) -> PricingResult<Discount> {
        let mut state = self.state.write().await;
        let removed = state
            .discounts
            .remove(&id)
            .ok_or(PricingError::DiscountNotFound(id))?;
        SynergyLinker::unlink(&mut state.discounts, id);
        Ok(removed)
    }

    pub async fn upsert_bonus(&self, bonus: Bonus) -> PricingResult<()> {
        BonusValidator::validate(&bonus)?;
        let mut state = self.state.write().await;
        state.bonuses.retain(|b| b.id != bonus.id);
        state.bonuses.push(bonus);
        Ok(())
    }

    /// Codes are unique regardless of letter case
    pub async fn upsert_promo_code(&self, promo: PromoCode) -> PricingResult<()> {
        PromoCodeValidator::validate(&promo)?;
        let mut state = self.state.write().await;
        if state
            .promo_codes
            .iter()
            .any(|p| p.id != promo.id && p.code.eq_ignore_ascii_case(&promo.code))
        {
            return Err(PricingError::InvalidPromoCode(format!(
                "code {} is already taken",
                promo.code
            )));
        }
        state.promo_codes.retain(|p| p.id != promo.id);
        state.promo_codes.push(promo);
        Ok(())
    }

    pub async fn discount(&self, id: DiscountId) -> Option<Discount> {
        self.state.read().await.discounts.get(&id).cloned()
    }
}

#[async_trait]
impl PriceLookup for InMemoryCatalog {
    async fn prices(&self, offer_ids: &[OfferId]) -> PricingResult<HashMap<OfferId, Decimal>> {
        let state = self.state.read().await;
        Ok(offer_ids
            .iter()
            .filter_map(|id| state.prices.get(id).map(|price| (*id, *price)))
            .collect())
    }
}

#[async_trait]
impl ProductLookup for InMemoryCatalog {
    async fn products(&self, offer_ids: &[OfferId]) -> PricingResult<HashMap<OfferId, ProductInfo>> {
        let state = self.state.read().await;
        Ok(offer_ids
            .iter()
            .filter_map(|id| state.products.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}

#[async_trait]
impl CustomerLookup for InMemoryCatalog {
    async fn customer(&self, customer_id: CustomerId) -> PricingResult<Option<Customer>> {
        Ok(self.state.read().await.customers.get(&customer_id).cloned())
    }
}

#[async_trait]
impl OrderLookup for InMemoryCatalog {
    async fn promo_code_usage(
        &self,
        customer_id: CustomerId,
        promo_code_id: PromoCodeId,
    ) -> PricingResult<u32> {
        Ok(self
            .state
            .read()
            .await
            .usage
            .get(&(customer_id, promo_code_id))
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl MarketingSource for InMemoryCatalog {
    /// In id order
    async fn discounts(&self) -> PricingResult<Vec<Discount>> {
        let state = self.state.read().await;
        let mut discounts: Vec<Discount> = state.discounts.values().cloned().collect();
        discounts.sort_by_key(|d| d.id);
        Ok(discounts)
    }

    async fn bonuses(&self) -> PricingResult<Vec<Bonus>> {
        Ok(self.state.read().await.bonuses.clone())
    }

    async fn promo_code(&self, code: &str) -> PricingResult<Option<PromoCode>> {
        Ok(self
            .state
            .read()
            .await
            .promo_codes
            .iter()
            .find(|p| p.code.eq_ignore_ascii_case(code))
            .cloned())
    }
}

#[async_trait]
impl ReferenceSource for InMemoryCatalog {
    async fn categories(&self) -> PricingResult<Vec<CategoryNode>> {
        Ok(self.state.read().await.categories.clone())
    }

    async fn pricing_options(&self) -> PricingResult<Option<PricingOptions>> {
        Ok(self.state.read().await.options.clone())
    }
}
