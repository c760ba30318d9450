//! Error taxonomy
//!
//! Decode and filter misses are not errors at all (see `DecodeOutcome`).
//! Per-race failures end up as a `RaceOutcome`. What remains here is what
//! crosses a component boundary: node/signer failures and the fatal
//! conditions that stop the watcher.

use thiserror::Error;

/// Failures talking to the node subscription collaborator
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    /// Subscribe call failed or the stream could not be opened (transient)
    #[error("pending subscription failed: {0}")]
    Subscription(String),
    /// A single request (fetch, receipt lookup) failed
    #[error("node request failed: {0}")]
    Request(String),
    /// Credentials rejected; resubscribing cannot help
    #[error("node access denied: {0}")]
    Unauthorized(String),
}

/// Failures reported by the signer collaborator
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    /// Authentication revoked or connection lost. Fatal for the core.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
    /// The node refused the request (revert on estimate, underpriced, bad nonce...)
    #[error("rejected by node: {0}")]
    Rejected(String),
    /// No receipt within the allotted wait
    #[error("timed out waiting for receipt")]
    Timeout,
}

impl SignerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SignerError::Unavailable(_))
    }
}

/// Fatal outcome of a single dispatched race unit
#[derive(Debug, Error)]
pub enum RaceError {
    #[error("signer lost during race: {0}")]
    SignerUnavailable(String),
}

/// Terminal errors of the watch loop
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("signer lost: {0}")]
    SignerLost(String),
    #[error("cannot resubscribe to pending transactions: {0}")]
    SubscriptionImpossible(String),
    #[error("{attempts} reconnects exhausted, last error: {last}")]
    ReconnectsExhausted { attempts: u32, last: String },
}

impl From<RaceError> for WatchError {
    fn from(err: RaceError) -> Self {
        match err {
            RaceError::SignerUnavailable(reason) => WatchError::SignerLost(reason),
        }
    }
}
