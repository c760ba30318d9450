//! Mempool — Type Definitions
//!
//! Purpose:
//!     Values that flow from the pending-transaction stream into a race:
//!     opaque refs, fetched envelopes, decoded swap calls and candidates.
//!
//! Dependencies:
//!     - alloy (Address, Bytes, TxHash, U256)

use alloy::primitives::{Address, Bytes, TxHash, U256};
use std::time::Instant;

/// Opaque identifier emitted by the pending subscription.
/// Only good for fetching the full transaction; consumed once per dispatch.
pub type PendingTransactionRef = TxHash;

/// Fetched transaction envelope. Immutable once fetched.
#[derive(Debug, Clone)]
pub struct RawTransaction {
    pub hash: TxHash,
    pub from: Address,
    /// None for contract creation
    pub to: Option<Address>,
    pub input: Bytes,
    /// Legacy gasPrice, or maxFeePerGas for EIP-1559 txs. None if the node reported neither.
    pub gas_price: Option<u128>,
}

/// Structured `swapExactTokensForTokens` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSwapCall {
    pub amount_in: U256,
    pub amount_out_min: U256,
    /// Ordered swap route
    pub path: Vec<Address>,
    pub recipient: Address,
    pub deadline: U256,
}

/// Why a transaction is not a swap we understand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotMatched {
    /// Not addressed to the target router; payload never inspected
    WrongDestination,
    /// Contract creation (no destination)
    ContractCreation,
    /// Addressed to the router but not the known call (selector or ABI mismatch)
    UnknownCall,
}

/// Tagged decoder result. There is no partial decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Matched(DecodedSwapCall),
    NotMatched(NotMatched),
}

impl DecodeOutcome {
    pub fn matched(self) -> Option<DecodedSwapCall> {
        match self {
            DecodeOutcome::Matched(call) => Some(call),
            DecodeOutcome::NotMatched(_) => None,
        }
    }
}

/// A decoded swap that passed the opportunity filter, with its envelope
#[derive(Debug, Clone)]
pub struct RaceCandidate {
    pub target: RawTransaction,
    pub call: DecodedSwapCall,
    /// When the ref arrived from the stream
    pub seen_at: Instant,
}
