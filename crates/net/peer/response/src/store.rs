//! Per-session store of peer response statistics.
//!
//! The store uses double-checked locking for the peer registry:
//! - Fast path: read lock to fetch an existing `Arc<Mutex<PeerStats>>`
//! - Slow path: write lock only on the first observation of a peer
//!
//! Each peer's stats sit behind their own mutex, so the block count and the
//! latency total always move together and updates for different peers never
//! contend.
//!
//! When the first-responder window is enabled, every credit is also queued in
//! FIFO order. Lock order is window, then registry, then peer.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::stats::PeerStats;
use crate::traits::ResponsePeerId;

type SharedStats = Arc<Mutex<PeerStats>>;

fn copy_stats(stats: &SharedStats) -> PeerStats {
    *stats.lock()
}

/// FIFO of credited peers, oldest first.
#[derive(Debug)]
struct FirstResponderWindow<Id> {
    queue: VecDeque<Id>,
    capacity: usize,
}

impl<Id: ResponsePeerId> FirstResponderWindow<Id> {
    fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue a credit, returning the peer whose oldest credit falls out.
    fn push(&mut self, peer: Id) -> Option<Id> {
        self.queue.push_back(peer);
        if self.queue.len() > self.capacity {
            self.queue.pop_front()
        } else {
            None
        }
    }
}

/// Outcome of [`ResponseStatsStore::record_block_received`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReceipt<Id> {
    /// The block was the first observation of the peer.
    pub new_peer: bool,
    /// Peer whose oldest first-responder credit was revoked.
    pub evicted: Option<Id>,
}

/// Response statistics for every peer observed by one session.
///
/// Unknown peers are not an error: [`stats`](Self::stats) returns the zero
/// value and recording creates the entry.
#[derive(Debug)]
pub struct ResponseStatsStore<Id: ResponsePeerId> {
    peers: RwLock<HashMap<Id, SharedStats>>,
    window: Option<Mutex<FirstResponderWindow<Id>>>,
}

impl<Id: ResponsePeerId> Default for ResponseStatsStore<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: ResponsePeerId> ResponseStatsStore<Id> {
    /// Create a store with an unbounded first-responder count.
    pub fn new() -> Self {
        Self::with_window_capacity(0)
    }

    /// Create a store keeping at most `capacity` first-responder credits.
    ///
    /// A capacity of zero disables the window.
    pub fn with_window_capacity(capacity: usize) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            window: (capacity > 0).then(|| Mutex::new(FirstResponderWindow::new(capacity))),
        }
    }

    fn get(&self, peer: &Id) -> Option<SharedStats> {
        self.peers.read().get(peer).cloned()
    }

    /// Fetch the peer's entry, inserting it on first observation.
    ///
    /// The flag is set only for the caller that performed the insert.
    fn get_or_create(&self, peer: &Id) -> (SharedStats, bool) {
        if let Some(stats) = self.get(peer) {
            return (stats, false);
        }

        match self.peers.write().entry(peer.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                debug!(?peer, "tracking new peer");
                (entry.insert(SharedStats::default()).clone(), true)
            }
        }
    }

    /// Overwrite the peer's want-have latency with the newest probe.
    ///
    /// Returns `true` if this started tracking `peer`.
    pub fn record_want_have_latency(&self, peer: &Id, latency: Duration) -> bool {
        let (stats, created) = self.get_or_create(peer);
        stats.lock().record_want_have_latency(latency);
        trace!(?peer, ?latency, "want-have latency");
        created
    }

    /// Credit `peer` with a first response and fold `latency` into its mean.
    ///
    /// The caller guarantees this runs once per (peer, block). With the window
    /// enabled, the oldest credit is revoked once capacity is exceeded and
    /// the peer it belonged to is reported in the receipt.
    pub fn record_block_received(&self, peer: &Id, latency: Duration) -> BlockReceipt<Id> {
        trace!(?peer, ?latency, "block latency");

        let Some(window) = &self.window else {
            let (stats, new_peer) = self.get_or_create(peer);
            let mut stats = stats.lock();
            stats.credit_first_response();
            stats.record_block_latency(latency);
            return BlockReceipt {
                new_peer,
                evicted: None,
            };
        };

        let mut window = window.lock();
        let (stats, new_peer) = self.get_or_create(peer);
        let evicted = window.push(peer.clone());
        if let Some(oldest) = &evicted {
            // Revoke before crediting so the outstanding total never passes capacity.
            if let Some(oldest_stats) = self.get(oldest) {
                oldest_stats.lock().revoke_first_response();
            }
            debug!(peer = ?oldest, "evicted first-responder credit");
        }

        let mut stats = stats.lock();
        stats.credit_first_response();
        stats.record_block_latency(latency);
        BlockReceipt { new_peer, evicted }
    }

    /// Recorded stats for `peer`, or the zero value if never observed.
    pub fn stats(&self, peer: &Id) -> PeerStats {
        self.get(peer).map(|stats| copy_stats(&stats)).unwrap_or_default()
    }

    /// Whether `peer` has an entry.
    pub fn contains(&self, peer: &Id) -> bool {
        self.peers.read().contains_key(peer)
    }

    /// Number of peers with recorded stats.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Whether no peer has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the first-responder window, `None` when disabled.
    pub fn window_capacity(&self) -> Option<usize> {
        self.window.as_ref().map(|window| window.lock().capacity)
    }

    /// Number of credits currently queued in the window (0 when disabled).
    pub fn window_len(&self) -> usize {
        self.window
            .as_ref()
            .map(|window| window.lock().queue.len())
            .unwrap_or(0)
    }

    /// Copy of every peer's stats.
    ///
    /// Taken under the window lock, so first-responder counts in the result
    /// are consistent with each other.
    pub fn snapshot(&self) -> Vec<(Id, PeerStats)> {
        let _window = self.window.as_ref().map(|window| window.lock());
        self.peers
            .read()
            .iter()
            .map(|(peer, stats)| (peer.clone(), copy_stats(stats)))
            .collect()
    }

    /// Sum of all peers' first-responder counts.
    pub fn total_first_responses(&self) -> u64 {
        self.snapshot()
            .iter()
            .map(|(_, stats)| stats.first_response_count)
            .sum()
    }

    /// Forget a peer, including any credits it holds in the window.
    pub fn remove_peer(&self, peer: &Id) -> Option<PeerStats> {
        let mut window = self.window.as_ref().map(|window| window.lock());
        if let Some(window) = window.as_mut() {
            window.queue.retain(|queued| queued != peer);
        }

        let removed = self.peers.write().remove(peer);
        removed.map(|stats| copy_stats(&stats))
    }

    /// Drop all stats and window credits, returning how many peers were dropped.
    pub fn clear(&self) -> usize {
        let mut window = self.window.as_ref().map(|window| window.lock());
        if let Some(window) = window.as_mut() {
            window.queue.clear();
        }

        let mut peers = self.peers.write();
        let removed = peers.len();
        peers.clear();
        removed
    }

    /// Run `f` with read access to the stats of each peer in `peers`.
    ///
    /// Holds the registry read lock for the whole call; unknown peers are
    /// passed the zero value.
    pub(crate) fn with_stats_of<T>(
        &self,
        peers: &[Id],
        mut f: impl FnMut(&Id, &PeerStats) -> T,
    ) -> Vec<T> {
        let registry = self.peers.read();
        let unknown = PeerStats::default();
        peers
            .iter()
            .map(|peer| match registry.get(peer) {
                Some(stats) => f(peer, &stats.lock()),
                None => f(peer, &unknown),
            })
            .collect()
    }
}
