//! Node subscription collaborator
//!
//! Pending-transaction subscription, fetch-by-hash and inclusion lookup.
//! `AlloyNode` implements it over a WebSocket provider; tests use a scripted
//! double.

use alloy::consensus::Transaction as TransactionTrait;
use alloy::network::TransactionResponse;
use alloy::primitives::TxHash;
use alloy::providers::Provider;
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::warn;

use crate::error::NodeError;
use crate::mempool::types::RawTransaction;

/// Lazy, unordered, possibly infinite stream of pending tx hashes
pub type PendingStream = Pin<Box<dyn Stream<Item = TxHash> + Send + 'static>>;

#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn subscribe_pending(&self) -> Result<PendingStream, NodeError>;

    /// `Ok(None)` when the node does not know the hash (dropped, replaced, or timed out)
    async fn fetch_transaction(&self, hash: TxHash) -> Result<Option<RawTransaction>, NodeError>;

    /// True once the transaction has a receipt
    async fn is_included(&self, hash: TxHash) -> Result<bool, NodeError>;
}

pub struct AlloyNode<P> {
    provider: P,
    fetch_timeout: Duration,
}

impl<P: Provider> AlloyNode<P> {
    pub fn new(provider: P, fetch_timeout: Duration) -> Self {
        Self {
            provider,
            fetch_timeout,
        }
    }

    fn map_tx<T>(tx: T) -> RawTransaction
    where
        T: TransactionTrait + TransactionResponse,
    {
        // EIP-1559 txs carry no gasPrice; their fee cap is the comparable bid
        let gas_price = TransactionTrait::gas_price(&tx)
            .or_else(|| Some(TransactionTrait::max_fee_per_gas(&tx)))
            .filter(|p| *p > 0);
        RawTransaction {
            hash: TransactionResponse::tx_hash(&tx),
            from: TransactionResponse::from(&tx),
            to: TransactionTrait::to(&tx),
            input: TransactionTrait::input(&tx).clone(),
            gas_price,
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> NodeClient for AlloyNode<P> {
    async fn subscribe_pending(&self) -> Result<PendingStream, NodeError> {
        let sub = self
            .provider
            .subscribe_pending_transactions()
            .await
            .map_err(classify_subscribe_error)?;
        Ok(Box::pin(sub.into_stream()))
    }

    async fn fetch_transaction(&self, hash: TxHash) -> Result<Option<RawTransaction>, NodeError> {
        let fut = self.provider.get_transaction_by_hash(hash);
        match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(result) => {
                let tx_opt = result.map_err(|e| NodeError::Request(e.to_string()))?;
                Ok(tx_opt.map(Self::map_tx))
            }
            Err(_) => {
                warn!(
                    %hash,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "tx fetch timeout"
                );
                Ok(None)
            }
        }
    }

    async fn is_included(&self, hash: TxHash) -> Result<bool, NodeError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| NodeError::Request(e.to_string()))?;
        Ok(receipt.is_some())
    }
}

/// Auth failures cannot be fixed by resubscribing; everything else is transient
fn classify_subscribe_error(err: TransportError) -> NodeError {
    match &err {
        RpcError::Transport(TransportErrorKind::HttpError(http))
            if http.status == 401 || http.status == 403 =>
        {
            NodeError::Unauthorized(err.to_string())
        }
        _ => NodeError::Subscription(err.to_string()),
    }
}
