//! Traits for peer identifiers and the session-facing tracking interface.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use auto_impl::auto_impl;

/// Opaque peer identifier.
///
/// Blanket-implemented for any type with Clone + Eq + Hash + Send + Sync + Debug.
/// No structure beyond equality and hashing is assumed.
pub trait ResponsePeerId: Clone + Eq + Hash + Send + Sync + Debug + 'static {}

impl<T> ResponsePeerId for T where T: Clone + Eq + Hash + Send + Sync + Debug + 'static {}

/// Interface a block session uses to report responses and pick peers.
///
/// Implementations never fail: unknown peers are the common case and an empty
/// candidate list simply yields `None`.
#[auto_impl(&, Arc)]
pub trait ResponseTracking<Id: ResponsePeerId>: Send + Sync {
    /// A want-have probe to `peer` completed after `latency`.
    fn on_want_have_latency(&self, peer: &Id, latency: Duration);

    /// A block arrived in full from `peer` after `latency`.
    ///
    /// Must be called once per (peer, block) pair, on first receipt. Duplicate
    /// and late arrivals are suppressed by the caller.
    fn on_block_latency(&self, peer: &Id, latency: Duration);

    /// Pick the peer to send the next block request to.
    fn select_peer(&self, candidates: &[Id]) -> Option<Id>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(u8, Duration, bool)>>,
    }

    impl ResponseTracking<u8> for Recorder {
        fn on_want_have_latency(&self, peer: &u8, latency: Duration) {
            self.events.lock().push((*peer, latency, false));
        }

        fn on_block_latency(&self, peer: &u8, latency: Duration) {
            self.events.lock().push((*peer, latency, true));
        }

        fn select_peer(&self, candidates: &[u8]) -> Option<u8> {
            candidates.first().copied()
        }
    }

    fn drive<T: ResponseTracking<u8>>(tracker: T) -> Option<u8> {
        tracker.on_want_have_latency(&1, Duration::from_millis(5));
        tracker.on_block_latency(&1, Duration::from_millis(7));
        tracker.select_peer(&[1, 2])
    }

    #[test]
    fn test_tracking_through_arc_and_ref() {
        let recorder = Arc::new(Recorder::default());

        assert_eq!(drive(Arc::clone(&recorder)), Some(1));
        assert_eq!(drive(&*recorder), Some(1));

        let events = recorder.events.lock();
        assert_eq!(events.len(), 4);
        assert!(!events[0].2);
        assert!(events[1].2);
    }
}
