//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (dispatches, per-provider submissions)
//! - Reconciler (status queries, state transitions, unmapped provider states)
//! - Migration (artifact ingests)
//! - External calls (provider latency)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Orchestrator Metrics
// =============================================================================

/// Dispatches total by result.
pub static DISPATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triptych_dispatches_total", "Total generation dispatches"),
        &["result"], // "success", "unknown_provider", "submission_failed", "store_failed"
    )
    .unwrap()
});

/// Provider submissions by provider and result.
pub static PROVIDER_SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "triptych_provider_submissions_total",
            "Total submissions sent to video providers",
        ),
        &["provider", "result"], // result: "success", "rejected", "timeout", "error"
    )
    .unwrap()
});

// =============================================================================
// Reconciler Metrics
// =============================================================================

/// Provider status queries by provider and result.
pub static STATUS_QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "triptych_status_queries_total",
            "Total status queries sent to video providers",
        ),
        &["provider", "result"],
    )
    .unwrap()
});

/// Job state transitions by target state.
pub static JOB_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triptych_job_transitions_total", "Total job state transitions"),
        &["to_state"],
    )
    .unwrap()
});

/// Provider states with no canonical mapping, by provider.
pub static UNKNOWN_PROVIDER_STATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "triptych_unknown_provider_states_total",
            "Status responses carrying a state with no canonical mapping",
        ),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Migration Metrics
// =============================================================================

/// Migrations by result.
pub static MIGRATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "triptych_migrations_total",
            "Total artifact migrations into durable storage",
        ),
        &["result"], // "success", "already_claimed", "failed"
    )
    .unwrap()
});

// =============================================================================
// External Call Metrics
// =============================================================================

/// Provider call duration in seconds.
pub static PROVIDER_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "triptych_provider_call_duration_seconds",
            "Duration of video provider API calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["provider", "operation"], // operation: "submit", "status"
    )
    .unwrap()
});

/// Label for a provider call result.
pub fn provider_result_label(result: &Result<impl Sized, crate::provider::ProviderError>) -> &'static str {
    use crate::provider::ProviderError;
    match result {
        Ok(_) => "success",
        Err(ProviderError::Rejected { .. }) | Err(ProviderError::UnsupportedRequest(_)) => {
            "rejected"
        }
        Err(ProviderError::Timeout { .. }) => "timeout",
        Err(_) => "error",
    }
}

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(DISPATCHES_TOTAL.clone()),
        Box::new(PROVIDER_SUBMISSIONS.clone()),
        // Reconciler
        Box::new(STATUS_QUERIES.clone()),
        Box::new(JOB_TRANSITIONS.clone()),
        Box::new(UNKNOWN_PROVIDER_STATES.clone()),
        // Migration
        Box::new(MIGRATIONS_TOTAL.clone()),
        // External calls
        Box::new(PROVIDER_CALL_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }

    #[test]
    fn test_provider_result_label() {
        let ok: Result<(), ProviderError> = Ok(());
        assert_eq!(provider_result_label(&ok), "success");

        let timeout: Result<(), ProviderError> = Err(ProviderError::Timeout {
            provider: "luma".to_string(),
        });
        assert_eq!(provider_result_label(&timeout), "timeout");

        let rejected: Result<(), ProviderError> = Err(ProviderError::Rejected {
            provider: "luma".to_string(),
            message: "HTTP 400".to_string(),
        });
        assert_eq!(provider_result_label(&rejected), "rejected");
    }
}
