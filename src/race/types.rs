//! Race — Type Definitions
//!
//! The competing transaction we build, and the terminal outcome of one race.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use std::fmt;
use std::time::Duration;

use crate::contracts::IUniswapV2Router02::swapExactTokensForTokensCall;

use super::bid::Bid;

/// Fully specified competing transaction. Built once per candidate and
/// consumed by exactly one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetingTransactionSpec {
    /// Operator account (signer)
    pub from: Address,
    /// Target router
    pub router: Address,
    pub chain_id: u64,
    pub nonce: u64,
    /// Gas price in wei (legacy pricing)
    pub gas_price: u128,
    /// Filled in after estimation
    pub gas_limit: Option<u64>,

    // swapExactTokensForTokens arguments
    pub amount_in: U256,
    /// Always zero: inclusion is bought at the cost of slippage protection.
    /// The competing swap executes at whatever price the pool offers.
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    /// Always the operator account
    pub recipient: Address,
    /// Unix seconds
    pub deadline: u64,
}

impl CompetingTransactionSpec {
    pub fn calldata(&self) -> Bytes {
        swapExactTokensForTokensCall {
            amountIn: self.amount_in,
            amountOutMin: self.amount_out_min,
            path: self.path.clone(),
            to: self.recipient,
            deadline: U256::from(self.deadline),
        }
        .abi_encode()
        .into()
    }

    pub fn to_request(&self) -> TransactionRequest {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.router)
            .with_input(self.calldata())
            .with_value(U256::ZERO)
            .with_nonce(self.nonce)
            .with_gas_price(self.gas_price)
            .with_chain_id(self.chain_id);

        match self.gas_limit {
            Some(limit) => tx.with_gas_limit(limit),
            None => tx,
        }
    }
}

/// Terminal result of a race. Set once, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome {
    /// Our tx was mined and succeeded
    ConfirmedIncluded {
        tx_hash: TxHash,
        block_number: Option<u64>,
    },
    /// Estimate, send, or execution refused. `tx_hash` is set if we got as far as broadcasting.
    RejectedByNode {
        reason: String,
        tx_hash: Option<TxHash>,
    },
    /// Broadcast, but no receipt before the deadline. Nonce is spent.
    TimedOut { tx_hash: TxHash },
    /// Our tx reverted and the target is already mined
    SupersededByTarget { tx_hash: TxHash },
}

impl RaceOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            RaceOutcome::ConfirmedIncluded { .. } => "confirmed_included",
            RaceOutcome::RejectedByNode { .. } => "rejected_by_node",
            RaceOutcome::TimedOut { .. } => "timed_out",
            RaceOutcome::SupersededByTarget { .. } => "superseded_by_target",
        }
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            RaceOutcome::ConfirmedIncluded { tx_hash, .. }
            | RaceOutcome::TimedOut { tx_hash }
            | RaceOutcome::SupersededByTarget { tx_hash } => Some(*tx_hash),
            RaceOutcome::RejectedByNode { tx_hash, .. } => *tx_hash,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, RaceOutcome::ConfirmedIncluded { .. })
    }
}

impl fmt::Display for RaceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RaceOutcome::ConfirmedIncluded { tx_hash, block_number } => match block_number {
                Some(block) => write!(f, "confirmed {:?} in block {}", tx_hash, block),
                None => write!(f, "confirmed {:?}", tx_hash),
            },
            RaceOutcome::RejectedByNode { reason, .. } => write!(f, "rejected: {}", reason),
            RaceOutcome::TimedOut { tx_hash } => write!(f, "timed out waiting for {:?}", tx_hash),
            RaceOutcome::SupersededByTarget { tx_hash } => {
                write!(f, "superseded by target ({:?} reverted)", tx_hash)
            }
        }
    }
}

/// Everything worth recording about one finished race
#[derive(Debug, Clone)]
pub struct RaceReport {
    /// The observed transaction we raced
    pub target: TxHash,
    pub nonce: u64,
    pub bid: Bid,
    pub gas_limit: Option<u64>,
    pub outcome: RaceOutcome,
    /// Stream sighting → broadcast. None if nothing was broadcast.
    pub broadcast_after: Option<Duration>,
    pub elapsed: Duration,
}
