//! Metrics for the catalog consistency core.
//!
//! Recording goes through the `metrics` facade, so library code can call
//! [`CatalogMetrics`] unconditionally; nothing is exported until a binary
//! installs the Prometheus recorder with [`init_metrics`].
//!
//! ```rust,ignore
//! use observability::{init_metrics, render_metrics, CatalogMetrics};
//!
//! init_metrics()?;
//! CatalogMetrics::record_cache_lookup("product", true);
//! println!("{}", render_metrics());
//! ```

pub mod catalog;

pub use catalog::CatalogMetrics;

pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder once per process
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        register_metric_descriptions();
        info!("Prometheus metrics recorder initialized");
        Ok(handle)
    })
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Prometheus text exposition of everything recorded so far
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        "catalog_cache_lookups_total",
        "Cache lookups by entity kind and result (hit/miss)"
    );
    describe_counter!(
        "catalog_lock_contention_total",
        "Writes rejected because another writer held the lock"
    );
    describe_counter!(
        "catalog_writes_total",
        "Create/update/delete calls by entity kind, operation and status"
    );
    describe_counter!(
        "catalog_cache_invalidation_failures_total",
        "Cache deletes that failed after a successful write"
    );
    describe_counter!(
        "catalog_stock_adjustments_total",
        "Bulk stock adjustment batches by status"
    );
    describe_histogram!(
        "catalog_stock_adjustment_duration_seconds",
        "Bulk stock adjustment duration in seconds"
    );
    describe_histogram!(
        "catalog_stock_adjustment_batch_size",
        "Products per bulk stock adjustment"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_before_init() {
        if get_metrics_handle().is_none() {
            assert!(render_metrics().starts_with("# Metrics not initialized"));
        }
    }
}
