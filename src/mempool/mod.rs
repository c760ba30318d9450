//! Mempool Module
//!
//! Purpose:
//!     Watch pending transactions, recognise router swaps through the target
//!     token and hand them to the race pipeline.
//!
//! Architecture:
//!     types.rs    — RawTransaction, DecodedSwapCall, DecodeOutcome, RaceCandidate
//!     decoder.rs  — (destination, calldata) → DecodeOutcome
//!     filter.rs   — target token anywhere in the path
//!     seen.rs     — TTL tracker that drops repeated refs before fetch
//!     watcher.rs  — subscription loop, dispatch, resubscribe with backoff

pub mod decoder;
pub mod filter;
pub mod seen;
pub mod types;
pub mod watcher;

pub use decoder::ChainDecoder;
pub use filter::OpportunityFilter;
pub use seen::SeenTracker;
pub use types::{DecodeOutcome, DecodedSwapCall, NotMatched, RaceCandidate, RawTransaction};
pub use watcher::{next_backoff, MempoolWatcher, ReconnectConfig};
