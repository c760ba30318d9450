//! Race Pipeline
//!
//! Purpose:
//!     Everything that happens to one pending ref after the watcher has
//!     dispatched it: fetch → decode → filter → submit → report.
//!
//! Dependencies:
//!     - dashmap (in-flight registry shared by concurrent units)
//!
//! Notes:
//!     - Each call to `handle` runs in its own spawned task. Only a lost
//!       signer comes back as an error; all other failures end as a log line
//!       and a counter.
//!     - Transactions sent from our own account are never raced; the
//!       filter only looks at the swap path.
//!     - The target is not re-checked for still being pending, and there is
//!       no cap on concurrent races.

use alloy::primitives::TxHash;
use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::error::RaceError;
use crate::mempool::decoder::ChainDecoder;
use crate::mempool::filter::OpportunityFilter;
use crate::mempool::types::{DecodeOutcome, RaceCandidate};
use crate::node::NodeClient;
use crate::race::bid::BidStrategy;
use crate::race::journal::OutcomeJournal;
use crate::race::nonce::NonceSequencer;
use crate::race::submitter::RaceSubmitter;
use crate::race::types::{RaceOutcome, RaceReport};
use crate::signer::Signer;
use crate::types::BotConfig;

/// Running counters, logged on the stats tick
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub seen: AtomicU64,
    pub duplicates: AtomicU64,
    pub not_found: AtomicU64,
    pub own_tx: AtomicU64,
    pub not_matched: AtomicU64,
    pub decoded: AtomicU64,
    pub matched: AtomicU64,
    pub confirmed: AtomicU64,
    pub rejected: AtomicU64,
    pub timed_out: AtomicU64,
    pub superseded: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn record_seen(&self) {
        bump(&self.seen);
    }

    pub fn record_duplicate(&self) {
        bump(&self.duplicates);
    }

    fn record_outcome(&self, outcome: &RaceOutcome) {
        bump(match outcome {
            RaceOutcome::ConfirmedIncluded { .. } => &self.confirmed,
            RaceOutcome::RejectedByNode { .. } => &self.rejected,
            RaceOutcome::TimedOut { .. } => &self.timed_out,
            RaceOutcome::SupersededByTarget { .. } => &self.superseded,
        });
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn log_summary(&self, tracking: usize, in_flight: usize) {
        info!(
            "RACER STATS | seen={} dup={} not_found={} own={} | decoded={} not_matched={} matched={} | \
             confirmed={} rejected={} timed_out={} superseded={} | in_flight={} tracking={}",
            Self::get(&self.seen),
            Self::get(&self.duplicates),
            Self::get(&self.not_found),
            Self::get(&self.own_tx),
            Self::get(&self.decoded),
            Self::get(&self.not_matched),
            Self::get(&self.matched),
            Self::get(&self.confirmed),
            Self::get(&self.rejected),
            Self::get(&self.timed_out),
            Self::get(&self.superseded),
            in_flight,
            tracking,
        );
    }
}

/// Removes the target from the in-flight registry however the unit ends
struct InFlightGuard<'a> {
    registry: &'a DashMap<TxHash, Instant>,
    target: TxHash,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.target);
    }
}

pub struct RacePipeline<S: ?Sized, N: ?Sized> {
    node: Arc<N>,
    decoder: ChainDecoder,
    filter: OpportunityFilter,
    submitter: RaceSubmitter<S, N>,
    stats: PipelineStats,
    /// target hash → dispatch time
    in_flight: DashMap<TxHash, Instant>,
    journal: Option<Mutex<OutcomeJournal>>,
}

impl<S, N> RacePipeline<S, N>
where
    S: Signer + ?Sized,
    N: NodeClient + ?Sized,
{
    pub fn new(
        node: Arc<N>,
        decoder: ChainDecoder,
        filter: OpportunityFilter,
        submitter: RaceSubmitter<S, N>,
    ) -> Self {
        Self {
            node,
            decoder,
            filter,
            submitter,
            stats: PipelineStats::default(),
            in_flight: DashMap::new(),
            journal: None,
        }
    }

    /// Wire the pipeline from configuration. Opens the outcome journal when
    /// `outcome_log_dir` is set.
    pub fn from_config(
        config: &BotConfig,
        node: Arc<N>,
        signer: Arc<S>,
        nonces: Arc<NonceSequencer>,
    ) -> Result<Self> {
        let bid = BidStrategy::new(
            config.floor_gas_price_wei(),
            config.bid_bump_percent,
            config.race_deadline(),
        );
        let submitter = RaceSubmitter::new(
            signer,
            Arc::clone(&node),
            nonces,
            bid,
            config.target_router,
            config.chain_id,
        )
        .with_amount_in(config.race_amount_in);

        let mut pipeline = Self::new(
            node,
            ChainDecoder::new(config.target_router),
            OpportunityFilter::new(config.target_token),
            submitter,
        );

        if let Some(dir) = &config.outcome_log_dir {
            pipeline = pipeline.with_journal(OutcomeJournal::new(dir)?);
            info!("Race outcomes: logging to {}", dir);
        }

        Ok(pipeline)
    }

    pub fn with_journal(mut self, journal: OutcomeJournal) -> Self {
        self.journal = Some(Mutex::new(journal));
        self
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Process one ref to completion. `Ok(None)` means it was not raced.
    pub async fn handle(&self, hash: TxHash, seen_at: Instant) -> Result<Option<RaceReport>, RaceError> {
        let _guard = match self.in_flight.entry(hash) {
            Entry::Occupied(_) => {
                debug!(%hash, "target already in flight, skipping");
                self.stats.record_duplicate();
                return Ok(None);
            }
            Entry::Vacant(slot) => {
                slot.insert(seen_at);
                InFlightGuard {
                    registry: &self.in_flight,
                    target: hash,
                }
            }
        };

        let target = match self.node.fetch_transaction(hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                trace!(%hash, "pending tx not found");
                bump(&self.stats.not_found);
                return Ok(None);
            }
            Err(e) => {
                debug!(%hash, error = %e, "pending tx fetch failed");
                bump(&self.stats.not_found);
                return Ok(None);
            }
        };

        if target.from == self.submitter.account() {
            trace!(%hash, "own transaction, skipping");
            bump(&self.stats.own_tx);
            return Ok(None);
        }

        let call = match self.decoder.decode(target.to, &target.input) {
            DecodeOutcome::Matched(call) => call,
            DecodeOutcome::NotMatched(reason) => {
                trace!(%hash, ?reason, "not a target swap");
                bump(&self.stats.not_matched);
                return Ok(None);
            }
        };
        bump(&self.stats.decoded);

        if !self.filter.matches(&call) {
            debug!(%hash, path_len = call.path.len(), "swap path misses target token");
            return Ok(None);
        }
        bump(&self.stats.matched);

        info!(
            "RACE: {:?} | from={:?} | amount_in={} | path_len={} | gas={:.1}gwei",
            hash,
            target.from,
            call.amount_in,
            call.path.len(),
            target.gas_price.unwrap_or_default() as f64 / 1e9,
        );

        let candidate = RaceCandidate {
            target,
            call,
            seen_at,
        };

        let report = match self.submitter.submit(&candidate).await {
            Ok(report) => report,
            Err(e) => {
                error!(%hash, error = %e, "race aborted, signer lost");
                return Err(e);
            }
        };

        self.stats.record_outcome(&report.outcome);
        self.log_report(&report);
        Ok(Some(report))
    }

    fn log_report(&self, report: &RaceReport) {
        let lead_ms = report.elapsed.as_millis() as u64;
        if report.outcome.is_confirmed() {
            info!(
                "RACE WON: target={:?} | nonce={} | {} | bid={:.1}gwei | {}ms",
                report.target,
                report.nonce,
                report.outcome,
                report.bid.price as f64 / 1e9,
                lead_ms,
            );
        } else {
            warn!(
                "RACE {}: target={:?} | nonce={} | {} | bid={:.1}gwei | {}ms",
                report.outcome.kind().to_uppercase(),
                report.target,
                report.nonce,
                report.outcome,
                report.bid.price as f64 / 1e9,
                lead_ms,
            );
        }

        if let Some(journal) = &self.journal {
            let mut journal = journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = journal.log(report) {
                warn!("Outcome journal write error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::bid::BidStrategy;
    use crate::testing::{
        hash, swap_tx, MockNode, MockSigner, ReceiptScript, OPERATOR, OTHER_TOKEN, ROUTER,
        TOKEN,
    };
    use crate::contracts::IUniswapV2Router02::swapExactTokensForTokensCall;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    fn pipeline(
        node: MockNode,
        signer: MockSigner,
    ) -> (RacePipeline<MockSigner, MockNode>, Arc<MockNode>, Arc<MockSigner>) {
        let node = Arc::new(node);
        let signer = Arc::new(signer);
        let submitter = RaceSubmitter::new(
            Arc::clone(&signer),
            Arc::clone(&node),
            Arc::new(NonceSequencer::new(0)),
            BidStrategy::with_floor(5_000_000_000),
            ROUTER,
            56,
        );
        let pipeline = RacePipeline::new(
            Arc::clone(&node),
            ChainDecoder::new(ROUTER),
            OpportunityFilter::new(TOKEN),
            submitter,
        );
        (pipeline, node, signer)
    }

    #[tokio::test]
    async fn test_end_to_end_confirmed() {
        let target = swap_tx(1, vec![OTHER_TOKEN, TOKEN], Some(50_000_000_000));
        let (pipeline, _, signer) = pipeline(MockNode::new().with_tx(target), MockSigner::new(0));

        let before = chrono::Utc::now().timestamp() as u64;
        let report = pipeline.handle(hash(1), Instant::now()).await.unwrap().unwrap();
        let after = chrono::Utc::now().timestamp() as u64;

        assert!(report.outcome.is_confirmed());
        assert_eq!(report.bid.price, 55_000_000_000);
        assert!(report.bid.deadline >= before + 60 && report.bid.deadline <= after + 60);

        let sent = signer.sent();
        assert_eq!(sent.len(), 1);
        let call = swapExactTokensForTokensCall::abi_decode(sent[0].input.input().unwrap()).unwrap();
        assert_eq!(call.amountOutMin, U256::ZERO);
        assert_eq!(call.path, vec![OTHER_TOKEN, TOKEN]);

        assert_eq!(PipelineStats::get(&pipeline.stats().confirmed), 1);
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_timed_out() {
        let target = swap_tx(1, vec![TOKEN, OTHER_TOKEN], Some(50_000_000_000));
        let signer = MockSigner::new(0).receipts(ReceiptScript::Never);
        let (pipeline, _, _) = pipeline(MockNode::new().with_tx(target), signer);

        let report = pipeline.handle(hash(1), Instant::now()).await.unwrap().unwrap();
        assert_eq!(report.outcome.kind(), "timed_out");
        assert_eq!(PipelineStats::get(&pipeline.stats().timed_out), 1);
    }

    #[tokio::test]
    async fn test_other_destination_never_raced() {
        let mut tx = swap_tx(1, vec![OTHER_TOKEN, TOKEN], Some(50_000_000_000));
        tx.to = Some(Address::with_last_byte(0x99));
        let (pipeline, _, signer) = pipeline(MockNode::new().with_tx(tx), MockSigner::new(0));

        assert!(pipeline.handle(hash(1), Instant::now()).await.unwrap().is_none());
        assert!(signer.estimated().is_empty());
        assert_eq!(PipelineStats::get(&pipeline.stats().not_matched), 1);
        assert_eq!(PipelineStats::get(&pipeline.stats().decoded), 0);
    }

    #[tokio::test]
    async fn test_path_without_token_is_skipped() {
        let tx = swap_tx(1, vec![OTHER_TOKEN, Address::with_last_byte(0x44)], Some(1));
        let (pipeline, _, signer) = pipeline(MockNode::new().with_tx(tx), MockSigner::new(0));

        assert!(pipeline.handle(hash(1), Instant::now()).await.unwrap().is_none());
        assert!(signer.sent().is_empty());
        assert_eq!(PipelineStats::get(&pipeline.stats().decoded), 1);
        assert_eq!(PipelineStats::get(&pipeline.stats().matched), 0);
    }

    #[tokio::test]
    async fn test_own_transaction_is_never_raced() {
        let mut tx = swap_tx(9, vec![OTHER_TOKEN, TOKEN], Some(55_000_000_000));
        tx.from = OPERATOR;
        let (pipeline, node, signer) = pipeline(MockNode::new().with_tx(tx), MockSigner::new(0));

        assert!(pipeline.handle(hash(9), Instant::now()).await.unwrap().is_none());
        assert_eq!(node.fetched(), vec![hash(9)]);
        assert!(signer.estimated().is_empty());
        assert!(signer.sent().is_empty());
        assert_eq!(PipelineStats::get(&pipeline.stats().own_tx), 1);
        assert_eq!(PipelineStats::get(&pipeline.stats().decoded), 0);
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unknown_ref_is_not_found() {
        let (pipeline, node, _) = pipeline(MockNode::new(), MockSigner::new(0));
        assert!(pipeline.handle(hash(7), Instant::now()).await.unwrap().is_none());
        assert_eq!(node.fetched(), vec![hash(7)]);
        assert_eq!(PipelineStats::get(&pipeline.stats().not_found), 1);
    }

    #[tokio::test]
    async fn test_in_flight_target_is_skipped() {
        let target = swap_tx(1, vec![TOKEN], Some(1));
        let (pipeline, node, _) = pipeline(MockNode::new().with_tx(target), MockSigner::new(0));

        pipeline.in_flight.insert(hash(1), Instant::now());
        assert!(pipeline.handle(hash(1), Instant::now()).await.unwrap().is_none());
        assert!(node.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_signer_loss_surfaces() {
        let target = swap_tx(1, vec![TOKEN], Some(1));
        let signer = MockSigner::new(0);
        signer.revoke();
        let (pipeline, _, _) = pipeline(MockNode::new().with_tx(target), signer);

        let err = pipeline.handle(hash(1), Instant::now()).await.unwrap_err();
        assert!(matches!(err, RaceError::SignerUnavailable(_)));
        assert_eq!(pipeline.in_flight(), 0);
    }
}
