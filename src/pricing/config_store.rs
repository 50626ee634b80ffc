// Reference Configuration Store
//
// Loads and caches the process-wide reference data the pricing core needs:
// the category hierarchy and the global pricing options.
// Implements a time-based cache with a configurable TTL (60 seconds by default).

use crate::pricing::{
    catalog::ReferenceSource,
    error::{PricingError, PricingResult},
    metrics::PerformanceMetrics,
    types::CategoryId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default time-to-live for cached reference data (60 seconds)
pub const CACHE_TTL: Duration = Duration::from_secs(60);

const CATEGORIES: &str = "categories";
const OPTIONS: &str = "options";

/// Category with its nested-set bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    #[serde(rename = "_lft")]
    pub lft: i64,
    #[serde(rename = "_rgt")]
    pub rgt: i64,
}

/// Category hierarchy with ancestor-or-self checks by bound containment
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<CategoryId, CategoryNode>,
}

impl CategoryTree {
    pub fn new(nodes: Vec<CategoryNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when `category` is `ancestor` itself or lies beneath it
    ///
    /// Unknown categories only match themselves.
    pub fn is_self_or_descendant(&self, category: CategoryId, ancestor: CategoryId) -> bool {
        if category == ancestor {
            return true;
        }
        match (self.nodes.get(&category), self.nodes.get(&ancestor)) {
            (Some(leaf), Some(root)) => root.lft <= leaf.lft && leaf.rgt <= root.rgt,
            _ => false,
        }
    }

    /// True when `category` falls under any of `ancestors`
    pub fn is_under_any(&self, category: CategoryId, ancestors: impl IntoIterator<Item = CategoryId>) -> bool {
        ancestors
            .into_iter()
            .any(|ancestor| self.is_self_or_descendant(category, ancestor))
    }
}

/// Global options for bonus redemption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingOptions {
    /// Points worth one currency unit
    pub bonus_per_currency_unit: Decimal,
    /// Share of a line price payable with points
    pub max_debit_percent_for_product: Decimal,
    /// Share of an already discounted line payable with points
    pub max_debit_percent_for_discount_product: Decimal,
    /// Share of the whole order payable with points
    pub max_debit_percent_for_order: Decimal,
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            bonus_per_currency_unit: Decimal::ONE,
            max_debit_percent_for_product: Decimal::from(99),
            max_debit_percent_for_discount_product: Decimal::from(50),
            max_debit_percent_for_order: Decimal::from(99),
        }
    }
}

impl PricingOptions {
    /// Validate option values
    pub fn validate(&self) -> PricingResult<()> {
        if self.bonus_per_currency_unit <= Decimal::ZERO {
            return Err(PricingError::InvalidConfiguration(
                "bonus_per_currency_unit must be positive".to_string(),
            ));
        }

        let percents = [
            ("max_debit_percent_for_product", self.max_debit_percent_for_product),
            (
                "max_debit_percent_for_discount_product",
                self.max_debit_percent_for_discount_product,
            ),
            ("max_debit_percent_for_order", self.max_debit_percent_for_order),
        ];
        for (name, value) in percents {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(PricingError::InvalidConfiguration(format!(
                    "{} must be between 0 and 100",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// In-memory cache for reference data
#[derive(Debug, Clone)]
struct ReferenceCache {
    categories: Arc<CategoryTree>,
    options: Arc<PricingOptions>,
    last_updated: HashMap<String, Instant>,
}

impl ReferenceCache {
    fn new() -> Self {
        Self {
            categories: Arc::new(CategoryTree::default()),
            options: Arc::new(PricingOptions::default()),
            last_updated: HashMap::new(),
        }
    }

    fn is_stale(&self, key: &str, ttl: Duration) -> bool {
        match self.last_updated.get(key) {
            Some(last_update) => last_update.elapsed() > ttl,
            None => true, // Never loaded
        }
    }

    fn mark_updated(&mut self, key: &str) {
        self.last_updated.insert(key.to_string(), Instant::now());
    }
}

/// Reference Configuration Store
///
/// Lazily loads reference data from its source and hands out shared,
/// immutable copies. Stale entries are reloaded on next access.
pub struct ReferenceStore {
    source: Arc<dyn ReferenceSource>,
    cache: Arc<RwLock<ReferenceCache>>,
    cache_ttl: Duration,
    metrics: Option<PerformanceMetrics>,
}

impl ReferenceStore {
    /// Create a new ReferenceStore with the default TTL
    pub fn new(source: Arc<dyn ReferenceSource>) -> Self {
        Self::with_ttl(source, CACHE_TTL)
    }

    pub fn with_ttl(source: Arc<dyn ReferenceSource>, cache_ttl: Duration) -> Self {
        Self {
            source,
            cache: Arc::new(RwLock::new(ReferenceCache::new())),
            cache_ttl,
            metrics: None,
        }
    }

    /// Create a new ReferenceStore with metrics tracking
    pub fn with_metrics(
        source: Arc<dyn ReferenceSource>,
        cache_ttl: Duration,
        metrics: PerformanceMetrics,
    ) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::with_ttl(source, cache_ttl)
        }
    }

    fn record_cache_hit(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_hit();
        }
    }

    fn record_cache_miss(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_miss();
        }
    }

    /// Get the category hierarchy with caching
    pub async fn get_category_tree(&self) -> PricingResult<Arc<CategoryTree>> {
        self.refresh_if_stale(CATEGORIES).await?;

        let cache = self.cache.read().await;
        Ok(cache.categories.clone())
    }

    /// Get pricing options with caching
    ///
    /// Falls back to defaults when the source has none configured.
    pub async fn get_pricing_options(&self) -> PricingResult<Arc<PricingOptions>> {
        self.refresh_if_stale(OPTIONS).await?;

        let cache = self.cache.read().await;
        Ok(cache.options.clone())
    }

    /// Refresh cache if data is stale
    async fn refresh_if_stale(&self, key: &str) -> PricingResult<()> {
        // Fast path under the read lock
        {
            let cache = self.cache.read().await;
            if !cache.is_stale(key, self.cache_ttl) {
                self.record_cache_hit();
                return Ok(());
            }
        }

        self.record_cache_miss();

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the write lock
        if !cache.is_stale(key, self.cache_ttl) {
            return Ok(());
        }

        match key {
            CATEGORIES => {
                let nodes = self.source.categories().await?;
                for node in &nodes {
                    if node.lft > node.rgt {
                        return Err(PricingError::InvalidConfiguration(format!(
                            "Category {} has left bound above right bound",
                            node.id
                        )));
                    }
                }
                tracing::debug!("Loaded {} categories", nodes.len());
                cache.categories = Arc::new(CategoryTree::new(nodes));
                cache.mark_updated(CATEGORIES);
            }
            OPTIONS => {
                let options = self.source.pricing_options().await?.unwrap_or_default();
                options.validate()?;
                cache.options = Arc::new(options);
                cache.mark_updated(OPTIONS);
            }
            _ => {
                return Err(PricingError::InvalidConfiguration(format!(
                    "Unknown reference key: {}",
                    key
                )));
            }
        }

        Ok(())
    }

    /// Invalidate every cached entry
    ///
    /// Forces the next access to reload from the source.
    pub async fn invalidate_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.last_updated.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl ReferenceSource for CountingSource {
        async fn categories(&self) -> PricingResult<Vec<CategoryNode>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                CategoryNode { id: 1, lft: 1, rgt: 6 },
                CategoryNode { id: 2, lft: 2, rgt: 3 },
            ])
        }

        async fn pricing_options(&self) -> PricingResult<Option<PricingOptions>> {
            Ok(None)
        }
    }

    fn tree() -> CategoryTree {
        // 1 [1..10] -> 2 [2..5] -> 3 [3..4]; 1 -> 4 [6..9]
        CategoryTree::new(vec![
            CategoryNode { id: 1, lft: 1, rgt: 10 },
            CategoryNode { id: 2, lft: 2, rgt: 5 },
            CategoryNode { id: 3, lft: 3, rgt: 4 },
            CategoryNode { id: 4, lft: 6, rgt: 9 },
        ])
    }

    #[test]
    fn test_reference_cache_is_stale() {
        let mut cache = ReferenceCache::new();

        assert!(cache.is_stale(CATEGORIES, Duration::from_secs(60)));

        cache.mark_updated(CATEGORIES);
        assert!(!cache.is_stale(CATEGORIES, Duration::from_secs(60)));
        assert!(cache.is_stale(CATEGORIES, Duration::from_secs(0)));
    }

    #[test]
    fn test_category_containment() {
        let tree = tree();

        assert!(tree.is_self_or_descendant(3, 1));
        assert!(tree.is_self_or_descendant(3, 2));
        assert!(tree.is_self_or_descendant(2, 2));
        assert!(!tree.is_self_or_descendant(2, 3));
        assert!(!tree.is_self_or_descendant(4, 2));
        assert!(tree.is_under_any(4, [2, 1]));
    }

    #[test]
    fn test_unknown_category_matches_only_itself() {
        let tree = tree();
        assert!(tree.is_self_or_descendant(99, 99));
        assert!(!tree.is_self_or_descendant(99, 1));
    }

    #[test]
    fn test_pricing_options_validation() {
        assert!(PricingOptions::default().validate().is_ok());

        let options = PricingOptions {
            bonus_per_currency_unit: Decimal::ZERO,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = PricingOptions {
            max_debit_percent_for_order: dec!(120),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[tokio::test]
    async fn test_store_loads_once_within_ttl() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let metrics = PerformanceMetrics::new();
        let store = ReferenceStore::with_metrics(source.clone(), CACHE_TTL, metrics.clone());

        let tree = store.get_category_tree().await.unwrap();
        assert_eq!(tree.len(), 2);
        let _ = store.get_category_tree().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        store.invalidate_cache().await;
        let _ = store.get_category_tree().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);

        let summary = metrics.summary();
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.cache_misses, 2);
    }

    #[tokio::test]
    async fn test_store_defaults_missing_options() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let store = ReferenceStore::new(source);

        let options = store.get_pricing_options().await.unwrap();
        assert_eq!(*options, PricingOptions::default());
    }
}
