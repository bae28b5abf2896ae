//! Peer responsiveness tracking and weighted peer selection for block sessions.
//!
//! A session reports want-have round trips and first block receipts per
//! peer; when it dispatches the next block request it asks the tracker to
//! pick one of the candidate peers. Peers are picked with probability
//! proportional to a strictly positive score, so proven-fast peers are
//! favoured while unknown peers keep a small chance of being explored.
//!
//! - [`ResponseStatsStore`]: per-peer statistics, optionally with a bounded
//!   FIFO window of first-responder credits
//! - [`ScoringPolicy`]: maps stats to a weight ([`LatencyWeighted`] by
//!   default, [`FirstResponderCount`] as an alternative)
//! - [`WeightedSelector`]: probability-proportional draw over an injectable
//!   [`RandomSource`]
//! - [`PeerResponseTracker`]: composes the three and implements
//!   [`ResponseTracking`] for the owning session
//!
//! # Usage
//!
//! ```ignore
//! use bitswap_peer_response::{PeerResponseTracker, TrackerConfig};
//!
//! // One tracker per session.
//! let tracker = PeerResponseTracker::new(TrackerConfig::default())?;
//!
//! tracker.on_want_have_latency(&peer, rtt);
//! tracker.on_block_latency(&peer, elapsed);
//!
//! if let Some(peer) = tracker.select_peer(&candidates) {
//!     send_want_block(peer, cid);
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod config;
mod error;
mod metrics;
mod policy;
mod select;
mod stats;
mod store;
mod tracker;
mod traits;

pub use config::{DEFAULT_WINDOW_CAPACITY, ScoringConfig, ScoringStrategy, TrackerConfig};
pub use error::ConfigError;
pub use policy::{FirstResponderCount, LatencyWeighted, ScoringPolicy, policy_from_config};
pub use select::{Choice, ChoiceKind, CyclicSource, RandomSource, WeightedSelector};
pub use stats::PeerStats;
pub use store::{BlockReceipt, ResponseStatsStore};
pub use tracker::{PeerResponseTracker, TrackerStats};
pub use traits::{ResponsePeerId, ResponseTracking};
