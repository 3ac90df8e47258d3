//! AI generation metrics.
//!
//! Counts provider calls, provider failures and accepted drafts so admins can
//! see how much of the translation content is machine-drafted.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct GenerationMetrics {
    provider_calls: AtomicUsize,
    provider_failures: AtomicUsize,
    drafts_accepted: AtomicUsize,
    drafts_with_errors: AtomicUsize,
}

impl GenerationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_draft_accepted(&self) {
        self.drafts_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Draft produced but failing placeholder validation
    pub fn record_draft_with_errors(&self) {
        self.drafts_with_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let calls = self.provider_calls.load(Ordering::Relaxed);
        let failures = self.provider_failures.load(Ordering::Relaxed);
        let provider_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            provider_calls: calls,
            provider_failures: failures,
            provider_success_rate,
            drafts_accepted: self.drafts_accepted.load(Ordering::Relaxed),
            drafts_with_errors: self.drafts_with_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the generation counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub provider_calls: usize,
    pub provider_failures: usize,
    /// Percentage (0-100)
    pub provider_success_rate: f64,
    pub drafts_accepted: usize,
    pub drafts_with_errors: usize,
}
