//! Signer collaborator
//!
//! Key custody and session authentication live outside the core. The core
//! only sees this capability: who am I, what is my nonce, estimate, sign and
//! send, wait for a receipt. `WalletSigner` is the alloy implementation over
//! a provider that already carries a wallet filler.

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, TxHash};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::SignerError;

/// Mined receipt, reduced to what the race needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    /// false = included but reverted
    pub success: bool,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait Signer: Send + Sync {
    fn current_account(&self) -> Address;

    /// On-chain transaction count (nonce seed)
    async fn transaction_count(&self, account: Address) -> Result<u64, SignerError>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, SignerError>;

    /// Sign and broadcast; the returned hash is the pending handle
    async fn sign_and_send(&self, tx: TransactionRequest) -> Result<TxHash, SignerError>;

    /// Wait up to `timeout` for a receipt; `SignerError::Timeout` on expiry
    async fn await_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt, SignerError>;
}

/// Signer backed by an alloy provider with a wallet attached
pub struct WalletSigner<P> {
    provider: P,
    account: Address,
    poll_interval: Duration,
}

impl<P: Provider> WalletSigner<P> {
    pub fn new(provider: P, account: Address, poll_interval: Duration) -> Self {
        Self {
            provider,
            account,
            poll_interval,
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> Signer for WalletSigner<P> {
    fn current_account(&self) -> Address {
        self.account
    }

    async fn transaction_count(&self, account: Address) -> Result<u64, SignerError> {
        self.provider
            .get_transaction_count(account)
            .await
            .map_err(classify_transport_error)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, SignerError> {
        self.provider
            .estimate_gas(tx.clone())
            .await
            .map_err(classify_transport_error)
    }

    async fn sign_and_send(&self, tx: TransactionRequest) -> Result<TxHash, SignerError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(classify_transport_error)?;
        Ok(*pending.tx_hash())
    }

    async fn await_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt, SignerError> {
        let poll = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        return Ok(Receipt {
                            tx_hash,
                            success: receipt.status(),
                            block_number: receipt.block_number(),
                        })
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let err = classify_transport_error(e);
                        if err.is_fatal() {
                            return Err(err);
                        }
                        debug!(%tx_hash, error = %err, "receipt poll failed, retrying");
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(SignerError::Timeout),
        }
    }
}

/// Map a transport error onto the signer taxonomy.
/// Lost connections and auth failures are fatal; the rest are per-request.
pub fn classify_transport_error(err: TransportError) -> SignerError {
    match &err {
        RpcError::ErrorResp(payload) => SignerError::Rejected(payload.message.to_string()),
        RpcError::Transport(TransportErrorKind::BackendGone)
        | RpcError::Transport(TransportErrorKind::PubsubUnavailable) => {
            SignerError::Unavailable(err.to_string())
        }
        RpcError::Transport(TransportErrorKind::HttpError(http))
            if http.status == 401 || http.status == 403 =>
        {
            SignerError::Unavailable(err.to_string())
        }
        _ => SignerError::Rejected(err.to_string()),
    }
}
