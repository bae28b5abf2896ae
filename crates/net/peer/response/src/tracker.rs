//! Session-owned peer response tracker.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::error::ConfigError;
use crate::metrics::TrackerMetrics;
use crate::policy::{ScoringPolicy, policy_from_config};
use crate::select::{ChoiceKind, RandomSource, WeightedSelector};
use crate::stats::PeerStats;
use crate::store::ResponseStatsStore;
use crate::traits::{ResponsePeerId, ResponseTracking};

/// Tracks how responsive each peer of a session is and picks the peer for
/// the next block request.
///
/// One tracker is created per session and dropped with it. It is shared
/// between the session's response handlers by reference or `Arc`; every
/// method takes `&self`.
pub struct PeerResponseTracker<Id: ResponsePeerId, R = StdRng> {
    config: TrackerConfig,
    store: ResponseStatsStore<Id>,
    policy: Arc<dyn ScoringPolicy>,
    selector: WeightedSelector<R>,
    metrics: TrackerMetrics,
}

impl<Id: ResponsePeerId> PeerResponseTracker<Id, StdRng> {
    /// Create a tracker whose random source is seeded from the operating system.
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        Self::with_random_source(config, StdRng::from_os_rng())
    }
}

impl<Id: ResponsePeerId> Default for PeerResponseTracker<Id, StdRng> {
    fn default() -> Self {
        let config = TrackerConfig::default();
        Self::build(config, WeightedSelector::from_os_rng())
    }
}

impl<Id: ResponsePeerId, R: RandomSource> PeerResponseTracker<Id, R> {
    /// Create a tracker drawing from `rng`.
    pub fn with_random_source(config: TrackerConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, WeightedSelector::new(rng)))
    }

    fn build(config: TrackerConfig, selector: WeightedSelector<R>) -> Self {
        Self {
            store: ResponseStatsStore::with_window_capacity(config.window_capacity),
            policy: policy_from_config(&config.scoring),
            selector,
            metrics: TrackerMetrics::default(),
            config,
        }
    }

    /// Replace the configured scoring policy.
    pub fn with_policy(mut self, policy: impl ScoringPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Validated configuration the tracker was built from.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Underlying per-peer statistics.
    pub fn store(&self) -> &ResponseStatsStore<Id> {
        &self.store
    }

    /// Policy turning stats into selection weights.
    pub fn policy(&self) -> &dyn ScoringPolicy {
        self.policy.as_ref()
    }

    /// Record a want-have round trip for `peer`.
    pub fn on_want_have_latency(&self, peer: &Id, latency: Duration) {
        if self.store.record_want_have_latency(peer, latency) {
            self.metrics.inc_tracked_peers();
        }
        self.metrics.inc_want_have();
    }

    /// Record the first full receipt of a block from `peer`.
    pub fn on_block_latency(&self, peer: &Id, latency: Duration) {
        let receipt = self.store.record_block_received(peer, latency);
        if receipt.new_peer {
            self.metrics.inc_tracked_peers();
        }
        if receipt.evicted.is_some() {
            self.metrics.inc_window_evictions();
        }
        self.metrics.inc_block();
    }

    /// Recorded stats for `peer`, or the zero value if never observed.
    pub fn stats(&self, peer: &Id) -> PeerStats {
        self.store.stats(peer)
    }

    /// Selection weight of `peer` under the current policy.
    pub fn value(&self, peer: &Id) -> f64 {
        self.policy.value(&self.store.stats(peer))
    }

    /// Selection weights of `candidates`, in order.
    pub fn values(&self, candidates: &[Id]) -> Vec<f64> {
        self.store
            .with_stats_of(candidates, |_, stats| self.policy.value(stats))
    }

    /// Pick a candidate with probability proportional to its value.
    ///
    /// Returns `None` only when `candidates` is empty. A single candidate is
    /// returned without drawing. Duplicates each contribute their own weight.
    pub fn select_peer(&self, candidates: &[Id]) -> Option<Id> {
        let weights = match candidates {
            [] => {
                self.metrics.inc_empty_selections();
                trace!("no candidates to select from");
                return None;
            }
            [only] => {
                self.metrics.inc_selections();
                return Some(only.clone());
            }
            _ => self.values(candidates),
        };

        let choice = self.selector.choose(&weights)?;
        if choice.kind == ChoiceKind::Fallback {
            debug!(
                candidates = candidates.len(),
                "weighted draw uncovered, selecting last candidate"
            );
            self.metrics.inc_selection_fallbacks();
        }
        self.metrics.inc_selections();

        let peer = candidates.get(choice.index).cloned();
        trace!(?peer, candidates = candidates.len(), "selected peer");
        peer
    }

    /// Candidates paired with their values, best first.
    pub fn rank(&self, candidates: &[Id]) -> Vec<(Id, f64)> {
        let mut ranked = self
            .store
            .with_stats_of(candidates, |peer, stats| {
                (peer.clone(), self.policy.value(stats))
            });
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Forget a peer that left the session.
    pub fn remove_peer(&self, peer: &Id) -> Option<PeerStats> {
        let removed = self.store.remove_peer(peer);
        if removed.is_some() {
            self.metrics.dec_tracked_peers(1);
        }
        removed
    }

    /// Forget every peer and window credit.
    pub fn clear(&self) {
        let removed = self.store.clear();
        self.metrics.dec_tracked_peers(removed);
    }

    /// Summary of the tracked state.
    pub fn stats_summary(&self) -> TrackerStats {
        let snapshot = self.store.snapshot();

        let (block_total, block_count) = snapshot.iter().fold(
            (Duration::ZERO, 0u64),
            |(total, count), (_, stats)| {
                (
                    total.saturating_add(stats.block_latency_total),
                    count.saturating_add(stats.block_response_count),
                )
            },
        );
        let mean_block_latency = (block_count > 0).then(|| {
            let nanos = block_total.as_nanos() / u128::from(block_count);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        });

        TrackerStats {
            tracked_peers: snapshot.len(),
            window_capacity: self.store.window_capacity(),
            window_len: self.store.window_len(),
            total_first_responses: snapshot
                .iter()
                .map(|(_, stats)| stats.first_response_count)
                .sum(),
            mean_block_latency,
        }
    }
}

impl<Id: ResponsePeerId, R: RandomSource> ResponseTracking<Id> for PeerResponseTracker<Id, R> {
    fn on_want_have_latency(&self, peer: &Id, latency: Duration) {
        PeerResponseTracker::on_want_have_latency(self, peer, latency)
    }

    fn on_block_latency(&self, peer: &Id, latency: Duration) {
        PeerResponseTracker::on_block_latency(self, peer, latency)
    }

    fn select_peer(&self, candidates: &[Id]) -> Option<Id> {
        PeerResponseTracker::select_peer(self, candidates)
    }
}

impl<Id: ResponsePeerId, R> Drop for PeerResponseTracker<Id, R> {
    fn drop(&mut self) {
        self.metrics.dec_tracked_peers(self.store.len());
    }
}

impl<Id: ResponsePeerId, R> std::fmt::Debug for PeerResponseTracker<Id, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerResponseTracker")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("tracked_peers", &self.store.len())
            .finish()
    }
}

/// Statistics about the tracker state.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerStats {
    /// Number of peers with recorded stats.
    pub tracked_peers: usize,
    /// Window capacity, if the window is enabled.
    pub window_capacity: Option<usize>,
    /// Number of credits queued in the window.
    pub window_len: usize,
    /// Sum of first-responder counts over all peers.
    pub total_first_responses: u64,
    /// Mean over every block latency sample from every peer.
    pub mean_block_latency: Option<Duration>,
}
