//! Scoring policies mapping peer stats to a selection weight.
//!
//! Every policy returns a strictly positive, finite value for any stats,
//! including the zero value of a peer that has never been observed. That
//! keeps unproven peers selectable while proven-fast peers are picked
//! proportionally more often.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use auto_impl::auto_impl;

use crate::config::{ScoringConfig, ScoringStrategy};
use crate::stats::PeerStats;

/// Maps a peer's stats to its selection weight.
#[auto_impl(&, Arc, Box)]
pub trait ScoringPolicy: Debug + Send + Sync {
    /// Selection weight for a peer. Always `> 0` and finite.
    fn value(&self, stats: &PeerStats) -> f64;
}

/// Build the policy selected by `config`.
pub fn policy_from_config(config: &ScoringConfig) -> Arc<dyn ScoringPolicy> {
    match config.strategy {
        ScoringStrategy::LatencyWeighted => Arc::new(LatencyWeighted::from_config(config)),
        ScoringStrategy::FirstResponder => Arc::new(FirstResponderCount),
    }
}

/// `1 / (alpha * want_have_ms + beta * avg_block_ms)`.
///
/// A signal without observations is replaced by the unknown-latency sentinel.
/// Observed latencies are floored at `min_latency` so a zero round trip cannot
/// make the weight infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyWeighted {
    alpha: f64,
    beta: f64,
    unknown_latency: Duration,
    min_latency: Duration,
}

impl LatencyWeighted {
    /// Create a policy with the given weights, sentinel and latency floor.
    pub fn new(alpha: f64, beta: f64, unknown_latency: Duration, min_latency: Duration) -> Self {
        Self {
            alpha,
            beta,
            unknown_latency,
            min_latency,
        }
    }

    /// Create a policy from the latency-weighted settings in `config`.
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(
            config.alpha,
            config.beta,
            config.unknown_latency(),
            config.min_latency(),
        )
    }

    fn effective_ms(&self, latency: Option<Duration>) -> f64 {
        let latency = latency
            .map(|l| l.max(self.min_latency))
            .unwrap_or(self.unknown_latency);
        latency.as_secs_f64() * 1000.0
    }
}

impl Default for LatencyWeighted {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl ScoringPolicy for LatencyWeighted {
    fn value(&self, stats: &PeerStats) -> f64 {
        let want_have_ms = self.effective_ms(stats.last_want_have_latency);
        let block_ms = self.effective_ms(stats.avg_block_latency());
        1.0 / (self.alpha * want_have_ms + self.beta * block_ms)
    }
}

/// Number of first-responder credits plus one, ignoring latency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstResponderCount;

impl ScoringPolicy for FirstResponderCount {
    fn value(&self, stats: &PeerStats) -> f64 {
        stats.first_response_count as f64 + 1.0
    }
}
