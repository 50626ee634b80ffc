// Checkout Pricing Module
//
// Prices a basket against the configured promotions:
// - Discounts: filtered, ordered and applied line by line, with synergy rules
//   deciding which of them may stack on the same line
// - Delivery: every candidate is priced, the selected one is committed
// - Promo codes: resolved per customer and measured in isolation
// - Bonuses: loyalty points accrued on final prices and spent within caps
//
// Collaborators are only awaited while the input is built; the calculation
// itself runs synchronously over the request-scoped input.

pub mod appliers;
pub mod bonus;
pub mod calculator;
pub mod catalog;
pub mod conditions;
pub mod config_store;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod handlers;
pub mod input;
pub mod memory;
pub mod metrics;
pub mod models;
pub mod output;
pub mod promo_code;
pub mod request;
pub mod synergy;
pub mod types;
pub mod validation;

// Re-export commonly used types for convenience
pub use bonus::{BonusCalculator, BonusMayBeSpentCalculator, BonusSpentCalculator};
pub use calculator::DiscountCalculator;
pub use catalog::{
    Collaborators, CustomerLookup, MarketingSource, OrderLookup, PriceLookup, ProductInfo,
    ProductLookup, ReferenceSource,
};
pub use config_store::{CategoryNode, CategoryTree, PricingOptions, ReferenceStore};
pub use error::{PricingError, PricingResult};
pub use fetcher::DiscountFetcher;
pub use input::{BasketItem, Customer, DeliveryOption, PricingInput};
pub use memory::{CatalogSnapshot, InMemoryCatalog};
pub use metrics::PerformanceMetrics;
pub use models::{Bonus, Discount, PromoCode};
pub use output::{AppliedDiscount, CatalogPrice, PricingOutput};
pub use promo_code::{PromoCodeCalculator, PromoCodeResolver};
pub use request::{CatalogRequest, PricingRequest, RequestedDelivery, RequestedOffer};
pub use types::{DiscountType, PaymentMethod, ValueType};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use self::types::OfferId;

/// Pricing Engine
///
/// Builds the input model from the collaborators, then runs promo code,
/// discount and bonus calculation over it.
pub struct PricingEngine {
    collaborators: Collaborators,
    reference: Arc<ReferenceStore>,
    metrics: PerformanceMetrics,
}

impl PricingEngine {
    pub fn new(
        collaborators: Collaborators,
        reference_source: Arc<dyn ReferenceSource>,
        cache_ttl: Duration,
    ) -> Self {
        let metrics = PerformanceMetrics::new();
        let reference = Arc::new(ReferenceStore::with_metrics(
            reference_source,
            cache_ttl,
            metrics.clone(),
        ));

        Self {
            collaborators,
            reference,
            metrics,
        }
    }

    /// Engine backed by one in-memory catalog for every port
    pub fn from_catalog(catalog: Arc<InMemoryCatalog>, cache_ttl: Duration) -> Self {
        Self::new(Collaborators::from_shared(catalog.clone()), catalog, cache_ttl)
    }

    /// Get performance metrics
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn reference(&self) -> &ReferenceStore {
        &self.reference
    }

    /// Warm up the reference cache
    ///
    /// Should be called on startup to avoid cold-start latency on the first
    /// request.
    pub async fn warm_cache(&self) -> PricingResult<()> {
        tracing::info!("Warming pricing reference cache...");

        let tree = self.reference.get_category_tree().await?;
        let _ = self.reference.get_pricing_options().await?;

        tracing::info!("Pricing reference cache warmed ({} categories)", tree.len());
        Ok(())
    }

    /// Hydrate a request into a pricing input
    ///
    /// Offers without a price are dropped and an unknown customer is priced as
    /// a guest.
    pub async fn build_input(&self, request: &PricingRequest) -> PricingResult<PricingInput> {
        let mut offer_ids: Vec<OfferId> = request.offers.iter().map(|o| o.offer_id).collect();
        offer_ids.sort_unstable();
        offer_ids.dedup();

        let prices = self.collaborators.prices.prices(&offer_ids).await?;
        let products = self.collaborators.products.products(&offer_ids).await?;

        let mut items: Vec<BasketItem> = Vec::new();
        for requested in &request.offers {
            let Some(price) = prices.get(&requested.offer_id) else {
                tracing::warn!("Offer {} has no price, dropped from the basket", requested.offer_id);
                continue;
            };

            if let Some(existing) = items
                .iter_mut()
                .find(|i| i.offer_id == requested.offer_id && i.bundle_id == requested.bundle_id)
            {
                existing.qty += requested.qty;
                continue;
            }

            let mut item = BasketItem::new(requested.offer_id, requested.qty, *price);
            item.bundle_id = requested.bundle_id;
            if let Some(product) = products.get(&requested.offer_id) {
                item.brand_id = product.brand_id;
                item.category_id = product.category_id;
                item.merchant_id = product.merchant_id;
                item.kind = product.kind;
                item.public_event_id = product.public_event_id;
                item.properties = product.properties.clone();
            }
            items.push(item);
        }

        let customer = match request.customer_id {
            Some(id) => match self.collaborators.customers.customer(id).await? {
                Some(mut customer) => {
                    customer.id = Some(id);
                    customer
                }
                None => {
                    tracing::warn!("Customer {} not found, pricing as guest", id);
                    Customer::guest()
                }
            },
            None => Customer::guest(),
        };

        let mut input = PricingInput::new(items);
        input.customer = customer;
        input.payment = request.payment;
        input.region_id = request.region_id;
        input.bonus_to_spend = request.bonus_to_spend;
        input.promo_code = request
            .promo_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);

        input.deliveries.items = request
            .deliveries
            .iter()
            .enumerate()
            .map(|(idx, d)| DeliveryOption::new(idx, d.method, d.price))
            .collect();
        input.deliveries.selected = match request.selected_delivery {
            Some(idx) if idx < input.deliveries.items.len() => Some(idx),
            Some(idx) => {
                tracing::warn!("Selected delivery {} does not exist, ignored", idx);
                None
            }
            None => None,
        };

        Ok(input)
    }

    /// Calculate a basket
    pub async fn calculate(&self, request: &PricingRequest) -> PricingResult<PricingOutput> {
        self.calculate_at(request, Utc::now()).await
    }

    /// Calculate a basket as of `now`
    pub async fn calculate_at(&self, request: &PricingRequest, now: DateTime<Utc>) -> PricingResult<PricingOutput> {
        let _timer = self.metrics.start_basket_calculation();

        let categories = self.reference.get_category_tree().await?;
        let options = self.reference.get_pricing_options().await?;
        let mut input = self.build_input(request).await?;

        let marketing = &self.collaborators.marketing;
        let discounts = marketing.discounts().await?;
        let bonuses = marketing.bonuses().await?;

        let promo = match &input.promo_code {
            Some(code) => {
                let _promo_timer = self.metrics.start_promo_code_check();
                PromoCodeResolver::new(marketing.clone(), self.collaborators.orders.clone())
                    .resolve(code, &input.customer, now)
                    .await?
            }
            None => None,
        };
        let mut applied_promo = promo.as_ref().map(|promo| {
            PromoCodeCalculator::new(&categories).calculate(promo, &mut input, &discounts, &bonuses, now)
        });

        let candidates = DiscountFetcher::select(&discounts, &input, &categories, None, now);
        let applied_discounts = DiscountCalculator::new(&categories).calculate(&mut input, candidates);

        let eligible = BonusCalculator::eligible(&bonuses, &input, now);
        let applied_bonuses = BonusCalculator::new(&categories).calculate(&mut input, &eligible);
        if let (Some(promo), Some(applied)) = (&promo, applied_promo.as_mut()) {
            PromoCodeCalculator::settle_bonus(promo, applied, &applied_bonuses);
        }

        let max_spendable = BonusMayBeSpentCalculator::calculate(&options, &input);
        if input.bonus_to_spend > 0 {
            BonusSpentCalculator::calculate(&options, &mut input);
        }

        let output = PricingOutput::assemble(
            &input,
            applied_promo,
            applied_discounts,
            applied_bonuses,
            max_spendable,
        );
        tracing::info!(
            "Basket priced: {} lines, total {} of {}",
            output.offers.len(),
            output.total_price,
            output.total_cost
        );
        Ok(output)
    }

    /// Product-card prices, one offer at a time
    ///
    /// Only discount types that make sense outside a basket are considered,
    /// without conditions, promo codes or cart-total bonuses.
    pub async fn calculate_catalog_prices(&self, request: &CatalogRequest) -> PricingResult<Vec<CatalogPrice>> {
        let _timer = self.metrics.start_catalog_calculation();
        let now = Utc::now();

        let categories = self.reference.get_category_tree().await?;
        let basket = PricingRequest {
            offers: request
                .offer_ids
                .iter()
                .map(|offer_id| RequestedOffer {
                    offer_id: *offer_id,
                    qty: 1,
                    bundle_id: None,
                })
                .collect(),
            ..Default::default()
        };
        let mut base = self.build_input(&basket).await?;
        base.customer.roles = request.role_ids.clone();
        base.customer.segment = request.segment_id;

        let marketing = &self.collaborators.marketing;
        let discounts = marketing.discounts().await?;
        let bonuses: Vec<Bonus> = BonusCalculator::eligible(&marketing.bonuses().await?, &base, now)
            .into_iter()
            .filter(|b| b.bonus_type.is_catalog())
            .collect();

        let calculator = DiscountCalculator::new(&categories);
        let accrual = BonusCalculator::new(&categories);
        let mut prices = Vec::with_capacity(base.items.len());

        for mut item in std::mem::take(&mut base.items) {
            item.qty = 1;
            let mut single = PricingInput::new(vec![item]);
            single.customer = base.customer.clone();

            let candidates: Vec<Discount> = DiscountFetcher::select(
                &discounts,
                &single,
                &categories,
                Some(&DiscountType::CATALOG[..]),
                now,
            )
            .into_iter()
            .filter(|d| !d.has_non_synergy_conditions())
            .collect();

            calculator.calculate(&mut single, candidates);
            accrual.calculate(&mut single, &bonuses);
            prices.extend(single.items.first().map(CatalogPrice::from));
        }

        Ok(prices)
    }
}
