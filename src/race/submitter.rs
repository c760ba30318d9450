//! Race Submitter
//!
//! Builds, signs, broadcasts and tracks the competing transaction for one
//! candidate. Steps, all inside the candidate's own task:
//!   1. compute bid, reserve nonce
//!   2. estimate gas with amountOutMin = 0
//!   3. estimate failed → release nonce unused, rejected-by-node
//!   4. sign + broadcast (nonce consumed from here on, even if send fails)
//!   5. wait for a receipt until the bid deadline → timed-out
//!   6. receipt → confirmed / superseded / rejected
//!
//! Risk: amountOutMin is forced to zero on purpose. The race buys inclusion
//! priority, not price; the competing swap accepts any output amount.
//! There is no replacement strategy: a timed-out nonce stays spent.

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{RaceError, SignerError};
use crate::mempool::types::RaceCandidate;
use crate::node::NodeClient;
use crate::signer::Signer;

use super::bid::BidStrategy;
use super::nonce::{NonceRelease, NonceSequencer};
use super::types::{CompetingTransactionSpec, RaceOutcome, RaceReport};

/// Wall clock in unix seconds
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

pub struct RaceSubmitter<S: ?Sized, N: ?Sized> {
    signer: Arc<S>,
    node: Arc<N>,
    nonces: Arc<NonceSequencer>,
    bid: BidStrategy,
    router: Address,
    chain_id: u64,
    /// Fixed amountIn instead of mirroring the target's
    amount_in_override: Option<U256>,
    clock: Clock,
}

impl<S, N> RaceSubmitter<S, N>
where
    S: Signer + ?Sized,
    N: NodeClient + ?Sized,
{
    pub fn new(
        signer: Arc<S>,
        node: Arc<N>,
        nonces: Arc<NonceSequencer>,
        bid: BidStrategy,
        router: Address,
        chain_id: u64,
    ) -> Self {
        Self {
            signer,
            node,
            nonces,
            bid,
            router,
            chain_id,
            amount_in_override: None,
            clock: Arc::new(unix_now),
        }
    }

    pub fn with_amount_in(mut self, amount_in: Option<U256>) -> Self {
        self.amount_in_override = amount_in;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Operator account that signs every competing tx
    pub fn account(&self) -> Address {
        self.signer.current_account()
    }

    pub fn nonces(&self) -> &NonceSequencer {
        &self.nonces
    }

    /// Race one candidate.
    /// Only a lost signer is an error; every other ending is a `RaceOutcome`.
    pub async fn submit(&self, candidate: &RaceCandidate) -> Result<RaceReport, RaceError> {
        let started = Instant::now();
        let now = (self.clock)();
        let target = candidate.target.hash;
        let bid = self.bid.compute_bid(candidate.target.gas_price, now);
        let account = self.signer.current_account();

        let nonce = self.nonces.reserve();

        let mut spec = CompetingTransactionSpec {
            from: account,
            router: self.router,
            chain_id: self.chain_id,
            nonce,
            gas_price: bid.price,
            gas_limit: None,
            amount_in: self.amount_in_override.unwrap_or(candidate.call.amount_in),
            amount_out_min: U256::ZERO,
            path: candidate.call.path.clone(),
            recipient: account,
            deadline: bid.deadline,
        };

        debug!(
            %target, nonce, gas_price = bid.price, deadline = bid.deadline,
            "racing candidate"
        );

        let report = |spec: &CompetingTransactionSpec,
                      broadcast_after: Option<Duration>,
                      outcome: RaceOutcome| RaceReport {
            target,
            nonce,
            bid,
            gas_limit: spec.gas_limit,
            outcome,
            broadcast_after,
            elapsed: started.elapsed(),
        };

        // Estimate before anything leaves the box
        match self.signer.estimate_gas(&spec.to_request()).await {
            Ok(limit) => spec.gas_limit = Some(limit),
            Err(e) => {
                self.nonces.release(nonce, NonceRelease::Unused);
                return match e {
                    SignerError::Unavailable(reason) => Err(RaceError::SignerUnavailable(reason)),
                    other => {
                        debug!(%target, nonce, error = %other, "gas estimation failed, nonce returned");
                        Ok(report(
                            &spec,
                            None,
                            RaceOutcome::RejectedByNode {
                                reason: format!("gas estimation failed: {}", other),
                                tx_hash: None,
                            },
                        ))
                    }
                };
            }
        }

        // Broadcast. From here the nonce counts as spent whatever happens.
        let sent = self.signer.sign_and_send(spec.to_request()).await;
        self.nonces.release(nonce, NonceRelease::Consumed);

        let tx_hash = match sent {
            Ok(hash) => hash,
            Err(SignerError::Unavailable(reason)) => return Err(RaceError::SignerUnavailable(reason)),
            Err(e) => {
                warn!(%target, nonce, error = %e, "broadcast rejected");
                return Ok(report(
                    &spec,
                    None,
                    RaceOutcome::RejectedByNode {
                        reason: format!("broadcast failed: {}", e),
                        tx_hash: None,
                    },
                ));
            }
        };

        let broadcast_after = candidate.seen_at.elapsed();
        info!(
            %target, %tx_hash, nonce,
            gas_price = bid.price,
            gas_limit = spec.gas_limit.unwrap_or_default(),
            seen_to_send_ms = broadcast_after.as_millis() as u64,
            "race tx submitted"
        );

        // Bounded wait up to the absolute deadline, minus time already spent
        let wait = bid.remaining((self.clock)());
        let outcome = match self.signer.await_receipt(tx_hash, wait).await {
            Ok(receipt) if receipt.success => RaceOutcome::ConfirmedIncluded {
                tx_hash,
                block_number: receipt.block_number,
            },
            Ok(receipt) => self.classify_revert(target, tx_hash, receipt.block_number).await,
            Err(SignerError::Timeout) => RaceOutcome::TimedOut { tx_hash },
            Err(SignerError::Unavailable(reason)) => return Err(RaceError::SignerUnavailable(reason)),
            Err(SignerError::Rejected(reason)) => RaceOutcome::RejectedByNode {
                reason,
                tx_hash: Some(tx_hash),
            },
        };

        Ok(report(&spec, Some(broadcast_after), outcome))
    }

    /// Our tx reverted: if the target already has a receipt, it beat us
    async fn classify_revert(
        &self,
        target: alloy::primitives::TxHash,
        tx_hash: alloy::primitives::TxHash,
        block_number: Option<u64>,
    ) -> RaceOutcome {
        match self.node.is_included(target).await {
            Ok(true) => RaceOutcome::SupersededByTarget { tx_hash },
            Ok(false) => RaceOutcome::RejectedByNode {
                reason: match block_number {
                    Some(block) => format!("reverted in block {}", block),
                    None => "reverted".to_string(),
                },
                tx_hash: Some(tx_hash),
            },
            Err(e) => {
                warn!(%target, error = %e, "target inclusion lookup failed");
                RaceOutcome::RejectedByNode {
                    reason: "reverted (target status unknown)".to_string(),
                    tx_hash: Some(tx_hash),
                }
            }
        }
    }
}
