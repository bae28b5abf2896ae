//! Peer response tracker metrics

use metrics::{Counter, Gauge};

/// Peer response tracker metrics
#[derive(Clone, Debug)]
pub(crate) struct TrackerMetrics {
    /// Number of want-have latencies recorded
    pub(crate) want_have_total: Counter,
    /// Number of block latencies recorded
    pub(crate) block_total: Counter,
    /// Number of first-responder credits evicted from the window
    pub(crate) window_evictions_total: Counter,
    /// Number of peers selected
    pub(crate) selections_total: Counter,
    /// Number of selections resolved by the last-candidate fallback
    pub(crate) selection_fallbacks_total: Counter,
    /// Number of selections asked to choose from no candidates
    pub(crate) empty_selections_total: Counter,
    /// Number of peers with recorded stats, summed over live trackers
    pub(crate) tracked_peers: Gauge,
}

impl Default for TrackerMetrics {
    fn default() -> Self {
        Self {
            want_have_total: metrics::counter!("bitswap.peer_response.want_have_total"),
            block_total: metrics::counter!("bitswap.peer_response.block_total"),
            window_evictions_total: metrics::counter!(
                "bitswap.peer_response.window_evictions_total"
            ),
            selections_total: metrics::counter!("bitswap.peer_response.selections_total"),
            selection_fallbacks_total: metrics::counter!(
                "bitswap.peer_response.selection_fallbacks_total"
            ),
            empty_selections_total: metrics::counter!(
                "bitswap.peer_response.empty_selections_total"
            ),
            tracked_peers: metrics::gauge!("bitswap.peer_response.tracked_peers"),
        }
    }
}

impl TrackerMetrics {
    pub(crate) fn inc_want_have(&self) {
        self.want_have_total.increment(1);
    }

    pub(crate) fn inc_block(&self) {
        self.block_total.increment(1);
    }

    pub(crate) fn inc_window_evictions(&self) {
        self.window_evictions_total.increment(1);
    }

    pub(crate) fn inc_selections(&self) {
        self.selections_total.increment(1);
    }

    pub(crate) fn inc_selection_fallbacks(&self) {
        self.selection_fallbacks_total.increment(1);
    }

    pub(crate) fn inc_empty_selections(&self) {
        self.empty_selections_total.increment(1);
    }

    pub(crate) fn inc_tracked_peers(&self) {
        self.tracked_peers.increment(1.0);
    }

    pub(crate) fn dec_tracked_peers(&self, count: usize) {
        if count > 0 {
            self.tracked_peers.decrement(count as f64);
        }
    }
}
