//! Prometheus metrics exposed by the project operator.
//!
//! Using `lazy_static`, the metrics are created once and are available
//! globally across all concurrent reconciliation loops. Exposition is left
//! to the deployment (metrics sidecar or scrape agent); the operator only
//! maintains the registry.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_histogram, register_int_counter, register_int_counter_vec, Histogram,
    IntCounter, IntCounterVec, Registry,
};

lazy_static! {
    /// Total number of Project reconciliations attempted.
    pub static ref RECONCILIATIONS_TOTAL: IntCounter =
        register_int_counter!(opts!(
            "project_operator_reconciliations_total",
            "Total number of Project reconciliations attempted."
        )).unwrap();

    /// Reconciliation errors, labeled by error type.
    pub static ref RECONCILIATION_ERRORS_TOTAL: IntCounterVec =
        register_int_counter_vec!(
            "project_operator_reconciliation_errors_total",
            "Total number of reconciliation errors.",
            &["error_type"]
        ).unwrap();

    /// Namespaces created on the platform by this operator.
    pub static ref NAMESPACES_CREATED_TOTAL: IntCounter =
        register_int_counter!(opts!(
            "project_operator_namespaces_created_total",
            "Total number of namespaces created on the platform."
        )).unwrap();

    /// Duration of Project reconcile passes.
    /// Buckets in seconds: 100ms to 30s.
    pub static ref RECONCILE_DURATION_SECONDS: Histogram =
        register_histogram!(
            "project_operator_reconcile_duration_seconds",
            "Duration of Project reconcile passes.",
            vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        ).unwrap();
}

/// Creates a new Prometheus registry and registers all custom metrics.
///
/// Intended to be called once at operator startup.
pub fn create_and_register_metrics() -> Result<Registry, prometheus::Error> {
    let r = Registry::new();
    r.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    r.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    r.register(Box::new(NAMESPACES_CREATED_TOTAL.clone()))?;
    r.register(Box::new(RECONCILE_DURATION_SECONDS.clone()))?;
    Ok(r)
}
