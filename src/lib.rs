//! Mempool Racer Library
//!
//! Watches a node's pending transactions for swaps on one router that touch
//! a target token, and races each one with a higher-priced competing swap.
//!
//! Pipeline: subscribe → dedupe → fetch → decode → filter → bid →
//! reserve nonce → estimate → sign/send → await receipt → RaceOutcome

pub mod config;
pub mod contracts;
pub mod error;
pub mod mempool;
pub mod node;
pub mod pipeline;
pub mod race;
pub mod signer;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{load_config, load_config_from_file, load_config_from_toml};
pub use error::{NodeError, RaceError, SignerError, WatchError};
pub use mempool::MempoolWatcher;
pub use node::{AlloyNode, NodeClient};
pub use pipeline::{PipelineStats, RacePipeline};
pub use race::{RaceOutcome, RaceReport};
pub use signer::{Signer, WalletSigner};
pub use types::BotConfig;
