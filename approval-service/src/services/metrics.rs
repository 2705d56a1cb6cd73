//! Prometheus metrics for approval-service.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, HistogramVec, IntCounter, TextEncoder, register_counter_vec,
    register_histogram_vec, register_int_counter,
};

/// Counter for generation runs by outcome.
pub static GENERATION_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "approval_generation_runs_total",
        "Total number of approval generation runs",
        &["outcome"]
    )
    .expect("Failed to register GENERATION_RUNS")
});

/// Counter for tolerated generation gaps (configuration_gap, resolution_miss,
/// malformed_condition).
pub static GENERATION_GAPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "approval_generation_gaps_total",
        "Total number of tolerated gaps during approval generation",
        &["kind"]
    )
    .expect("Failed to register GENERATION_GAPS")
});

/// Requisitions submitted without any actionable approval.
pub static REQUISITIONS_WITHOUT_APPROVALS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "approval_requisitions_without_approvals_total",
        "Requisitions submitted with zero generated approvals"
    )
    .expect("Failed to register REQUISITIONS_WITHOUT_APPROVALS")
});

pub static SCOPE_COMPUTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "approval_scope_computations_total",
        "Total number of visibility scope computations",
        &["tier"]
    )
    .expect("Failed to register SCOPE_COMPUTATIONS")
});

pub static CACHE_LOOKUPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "approval_cache_lookups_total",
        "Configuration cache lookups",
        &["cache", "result"]
    )
    .expect("Failed to register CACHE_LOOKUPS")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "approval_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&GENERATION_RUNS);
    Lazy::force(&GENERATION_GAPS);
    Lazy::force(&REQUISITIONS_WITHOUT_APPROVALS);
    Lazy::force(&SCOPE_COMPUTATIONS);
    Lazy::force(&CACHE_LOOKUPS);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_generation_run(outcome: &str) {
    GENERATION_RUNS.with_label_values(&[outcome]).inc();
}

pub fn record_generation_gap(kind: &str) {
    GENERATION_GAPS.with_label_values(&[kind]).inc();
}

pub fn record_requisition_without_approvals() {
    REQUISITIONS_WITHOUT_APPROVALS.inc();
}

pub fn record_scope_computation(tier: &str) {
    SCOPE_COMPUTATIONS.with_label_values(&[tier]).inc();
}

pub fn record_cache_lookup(cache: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS.with_label_values(&[cache, result]).inc();
}
