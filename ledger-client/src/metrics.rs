//! Metrics collection for observability
//!
//! Prometheus metrics for the submission pipeline, kept in a private
//! registry so several clients can live in one process.
//!
//! # Metrics
//!
//! - `ledger_client_transactions_submitted_total` - Signed transactions handed to the ledger
//! - `ledger_client_submit_retries_total` - Transport-level resubmissions
//! - `ledger_client_rebroadcasts_total` - Resends of pending transactions while polling
//! - `ledger_client_transactions_confirmed_total` - Confirmed successes
//! - `ledger_client_transactions_rejected_total` - Ledger-confirmed program rejections
//! - `ledger_client_transactions_expired_total` - Freshness windows that lapsed unconfirmed
//! - `ledger_client_confirmation_seconds` - Submit-to-terminal latency

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions submitted
    pub submitted: IntCounter,

    /// Transport retries
    pub submit_retries: IntCounter,

    /// Rebroadcasts during confirmation polling
    pub rebroadcasts: IntCounter,

    /// Confirmed successes
    pub confirmed: IntCounter,

    /// Program rejections
    pub rejected: IntCounter,

    /// Expired transactions
    pub expired: IntCounter,

    /// Confirmation latency histogram
    pub confirmation_latency: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let submitted = counter(
            &registry,
            "ledger_client_transactions_submitted_total",
            "Signed transactions handed to the ledger",
        )?;
        let submit_retries = counter(
            &registry,
            "ledger_client_submit_retries_total",
            "Transport-level resubmissions",
        )?;
        let rebroadcasts = counter(
            &registry,
            "ledger_client_rebroadcasts_total",
            "Resends of pending transactions while polling",
        )?;
        let confirmed = counter(
            &registry,
            "ledger_client_transactions_confirmed_total",
            "Transactions confirmed successfully",
        )?;
        let rejected = counter(
            &registry,
            "ledger_client_transactions_rejected_total",
            "Transactions rejected by a program",
        )?;
        let expired = counter(
            &registry,
            "ledger_client_transactions_expired_total",
            "Transactions whose freshness window lapsed unconfirmed",
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_client_confirmation_seconds",
                "Submit-to-terminal latency",
            )
            .buckets(vec![0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            submitted,
            submit_retries,
            rebroadcasts,
            confirmed,
            rejected,
            expired,
            confirmation_latency,
            registry,
        })
    }

    /// Record a terminal outcome with its latency
    pub fn record_outcome(&self, outcome: &crate::pipeline::TxState, latency_seconds: f64) {
        use crate::pipeline::TxState;
        match outcome {
            TxState::Confirmed => self.confirmed.inc(),
            TxState::Failed(_) => self.rejected.inc(),
            TxState::Expired => self.expired.inc(),
            _ => return,
        }
        self.confirmation_latency.observe(latency_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every metric in the Prometheus text format
    pub fn render(&self) -> String {
        use prometheus::Encoder;
        let mut buffer = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("submitted", &self.submitted.get())
            .field("confirmed", &self.confirmed.get())
            .field("rejected", &self.rejected.get())
            .field("expired", &self.expired.get())
            .finish()
    }
}
