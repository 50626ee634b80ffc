// Performance Metrics for the Pricing Engine
//
// Tracks execution times of basket calculations, catalog price calculations and
// promo code resolutions, plus reference cache hit rates.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs longer than this are counted as slow and warned about
const SLOW_RUN: Duration = Duration::from_millis(100);

/// Timed operations of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    BasketCalculation,
    CatalogCalculation,
    PromoCodeCheck,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::BasketCalculation => "basket calculation",
            Operation::CatalogCalculation => "catalog calculation",
            Operation::PromoCodeCheck => "promo code check",
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    runs: AtomicU64,
    elapsed_us: AtomicU64,
    slow_runs: AtomicU64,
}

impl Counters {
    fn add(&self, elapsed: Duration) -> bool {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.elapsed_us
            .fetch_add(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX), Ordering::Relaxed);

        let slow = elapsed > SLOW_RUN;
        if slow {
            self.slow_runs.fetch_add(1, Ordering::Relaxed);
        }
        slow
    }

    fn read(&self) -> OperationSummary {
        let runs = self.runs.load(Ordering::Relaxed);
        let elapsed_us = self.elapsed_us.load(Ordering::Relaxed);

        OperationSummary {
            count: runs,
            avg_time_ms: if runs == 0 {
                0.0
            } else {
                elapsed_us as f64 / runs as f64 / 1000.0
            },
            slow: self.slow_runs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    basket: Counters,
    catalog: Counters,
    promo_code: Counters,
}

impl Registry {
    fn counters(&self, operation: Operation) -> &Counters {
        match operation {
            Operation::BasketCalculation => &self.basket,
            Operation::CatalogCalculation => &self.catalog,
            Operation::PromoCodeCheck => &self.promo_code,
        }
    }
}

/// Performance metrics shared by the engine and its reference store
///
/// Cloning is cheap; all clones feed the same counters.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    registry: Arc<Registry>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.registry.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.registry.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of reference lookups served from cache, 0.0 when nothing was looked up
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.registry.cache_hits.load(Ordering::Relaxed);
        let lookups = hits + self.registry.cache_misses.load(Ordering::Relaxed);
        if lookups == 0 {
            return 0.0;
        }
        hits as f64 / lookups as f64
    }

    pub fn start(&self, operation: Operation) -> OperationTimer {
        OperationTimer {
            started: Instant::now(),
            operation,
            metrics: self.clone(),
        }
    }

    pub fn start_basket_calculation(&self) -> OperationTimer {
        self.start(Operation::BasketCalculation)
    }

    pub fn start_catalog_calculation(&self) -> OperationTimer {
        self.start(Operation::CatalogCalculation)
    }

    pub fn start_promo_code_check(&self) -> OperationTimer {
        self.start(Operation::PromoCodeCheck)
    }

    fn finish(&self, operation: Operation, elapsed: Duration) {
        if self.registry.counters(operation).add(elapsed) {
            tracing::warn!("Slow {}: {}ms", operation.label(), elapsed.as_millis());
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cache_hit_rate: self.cache_hit_rate(),
            cache_hits: self.registry.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.registry.cache_misses.load(Ordering::Relaxed),
            basket_calculations: self.registry.basket.read(),
            catalog_calculations: self.registry.catalog.read(),
            promo_code_checks: self.registry.promo_code.read(),
        }
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        tracing::info!(
            "Reference cache: {:.1}% hit rate ({} hits, {} misses)",
            summary.cache_hit_rate * 100.0,
            summary.cache_hits,
            summary.cache_misses
        );
        for (operation, stats) in [
            (Operation::BasketCalculation, &summary.basket_calculations),
            (Operation::CatalogCalculation, &summary.catalog_calculations),
            (Operation::PromoCodeCheck, &summary.promo_code_checks),
        ] {
            tracing::info!(
                "{}: {} runs, avg {:.2}ms, {} slow",
                operation.label(),
                stats.count,
                stats.avg_time_ms,
                stats.slow
            );
        }
    }
}

/// Records the elapsed time of one operation when dropped
pub struct OperationTimer {
    started: Instant,
    operation: Operation,
    metrics: PerformanceMetrics,
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        self.metrics.finish(self.operation, self.started.elapsed());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub count: u64,
    pub avg_time_ms: f64,
    pub slow: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub cache_hit_rate: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub basket_calculations: OperationSummary,
    pub catalog_calculations: OperationSummary,
    pub promo_code_checks: OperationSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fresh_metrics_are_zero() {
        let summary = PerformanceMetrics::new().summary();
        assert_eq!(summary.cache_hit_rate, 0.0);
        assert_eq!(summary.basket_calculations.count, 0);
        assert_eq!(summary.basket_calculations.avg_time_ms, 0.0);
    }

    #[test]
    fn test_cache_hit_rate() {
        let metrics = PerformanceMetrics::new();

        metrics.record_cache_miss();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();

        assert_eq!(metrics.cache_hit_rate(), 0.75);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = PerformanceMetrics::new();
        let clone = metrics.clone();

        drop(clone.start(Operation::PromoCodeCheck));

        assert_eq!(metrics.summary().promo_code_checks.count, 1);
    }

    #[test]
    fn test_dropped_timer_records_duration() {
        let metrics = PerformanceMetrics::new();

        {
            let _timer = metrics.start_catalog_calculation();
            thread::sleep(Duration::from_millis(10));
        }

        let summary = metrics.summary();
        assert_eq!(summary.catalog_calculations.count, 1);
        assert!(summary.catalog_calculations.avg_time_ms >= 10.0);
        assert_eq!(summary.basket_calculations.count, 0);
    }

    #[test]
    fn test_slow_runs_are_counted() {
        let metrics = PerformanceMetrics::new();

        {
            let _timer = metrics.start_basket_calculation();
            thread::sleep(Duration::from_millis(150));
        }
        drop(metrics.start_basket_calculation());

        let summary = metrics.summary();
        assert_eq!(summary.basket_calculations.count, 2);
        assert_eq!(summary.basket_calculations.slow, 1);
    }
}
