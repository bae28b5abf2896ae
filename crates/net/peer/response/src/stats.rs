//! Per-peer response statistics.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Observations accumulated for a single peer.
///
/// The zero value (`PeerStats::default()`) is what an unobserved peer looks
/// like. Block latency is kept as a total plus a sample count so the average
/// is the exact mean of every recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeerStats {
    /// Number of outstanding first-responder credits.
    pub first_response_count: u64,
    /// Most recent want-have round trip, not averaged.
    pub last_want_have_latency: Option<Duration>,
    /// Sum of all recorded block latencies.
    pub block_latency_total: Duration,
    /// Number of block latency samples in `block_latency_total`.
    pub block_response_count: u64,
}

impl PeerStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the want-have latency with the newest probe.
    pub fn record_want_have_latency(&mut self, latency: Duration) {
        self.last_want_have_latency = Some(latency);
    }

    /// Fold one block latency sample into the running mean.
    pub fn record_block_latency(&mut self, latency: Duration) {
        self.block_latency_total = self.block_latency_total.saturating_add(latency);
        self.block_response_count = self.block_response_count.saturating_add(1);
    }

    /// Count one block this peer delivered first.
    pub fn credit_first_response(&mut self) {
        self.first_response_count = self.first_response_count.saturating_add(1);
    }

    /// Floors at zero.
    pub fn revoke_first_response(&mut self) {
        self.first_response_count = self.first_response_count.saturating_sub(1);
    }

    /// Average block latency.
    ///
    /// Returns `None` if no block has been received from this peer.
    pub fn avg_block_latency(&self) -> Option<Duration> {
        if self.block_response_count == 0 {
            return None;
        }
        let nanos = self.block_latency_total.as_nanos() / u128::from(self.block_response_count);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Returns true if anything has been recorded for this peer.
    pub fn has_activity(&self) -> bool {
        self.last_want_have_latency.is_some() || self.block_response_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let stats = PeerStats::new();
        assert_eq!(stats.first_response_count, 0);
        assert_eq!(stats.block_response_count, 0);
        assert!(stats.avg_block_latency().is_none());
        assert!(stats.last_want_have_latency.is_none());
        assert!(!stats.has_activity());
    }

    #[test]
    fn test_want_have_overwrites() {
        let mut stats = PeerStats::new();

        stats.record_want_have_latency(Duration::from_millis(80));
        stats.record_want_have_latency(Duration::from_millis(20));
        assert_eq!(stats.last_want_have_latency, Some(Duration::from_millis(20)));

        // A slower probe still replaces a faster one.
        stats.record_want_have_latency(Duration::from_millis(300));
        assert_eq!(stats.last_want_have_latency, Some(Duration::from_millis(300)));
        assert!(stats.has_activity());
    }

    #[test]
    fn test_block_latency_averaging() {
        let mut stats = PeerStats::new();

        stats.record_block_latency(Duration::from_millis(100));
        assert_eq!(stats.avg_block_latency(), Some(Duration::from_millis(100)));

        stats.record_block_latency(Duration::from_millis(200));
        assert_eq!(stats.avg_block_latency(), Some(Duration::from_millis(150)));

        stats.record_block_latency(Duration::from_millis(300));
        assert_eq!(stats.avg_block_latency(), Some(Duration::from_millis(200)));
        assert_eq!(stats.block_response_count, 3);
    }

    #[test]
    fn test_revoke_floors_at_zero() {
        let mut stats = PeerStats::new();

        stats.credit_first_response();
        stats.revoke_first_response();
        stats.revoke_first_response();
        assert_eq!(stats.first_response_count, 0);
    }
}
