//! Catalog cache, lock and write metrics.

use metrics::{counter, histogram};

pub struct CatalogMetrics;

impl CatalogMetrics {
    pub fn record_cache_lookup(kind: &'static str, hit: bool) {
        counter!(
            "catalog_cache_lookups_total",
            "kind" => kind,
            "result" => if hit { "hit" } else { "miss" }
        )
        .increment(1);
    }

    pub fn record_lock_contention(kind: &'static str, operation: &str) {
        counter!(
            "catalog_lock_contention_total",
            "kind" => kind,
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    pub fn record_write(kind: &'static str, operation: &str, success: bool) {
        counter!(
            "catalog_writes_total",
            "kind" => kind,
            "operation" => operation.to_string(),
            "status" => status(success)
        )
        .increment(1);
    }

    pub fn record_invalidation_failure(kind: &'static str) {
        counter!("catalog_cache_invalidation_failures_total", "kind" => kind).increment(1);
    }

    pub fn record_stock_adjustment(batch_size: usize, success: bool, duration_secs: f64) {
        counter!("catalog_stock_adjustments_total", "status" => status(success)).increment(1);
        histogram!("catalog_stock_adjustment_duration_seconds").record(duration_secs);
        histogram!("catalog_stock_adjustment_batch_size").record(batch_size as f64);

        tracing::debug!(batch_size, success, duration_secs, "Stock adjustment recorded");
    }
}

fn status(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}
