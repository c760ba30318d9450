//! Scripted node and signer doubles for unit tests.

use alloy::primitives::{keccak256, Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::contracts::IUniswapV2Router02::swapExactTokensForTokensCall;
use crate::error::{NodeError, SignerError};
use crate::mempool::types::RawTransaction;
use crate::node::{NodeClient, PendingStream};
use crate::signer::{Receipt, Signer};

pub const ROUTER: Address = Address::with_last_byte(1);
pub const TOKEN: Address = Address::with_last_byte(2);
pub const OTHER_TOKEN: Address = Address::with_last_byte(3);
pub const OPERATOR: Address = Address::with_last_byte(0xee);

pub fn hash(n: u8) -> TxHash {
    TxHash::with_last_byte(n)
}

/// Pending swap on `ROUTER` through `path`
pub fn swap_tx(n: u8, path: Vec<Address>, gas_price: Option<u128>) -> RawTransaction {
    let call = swapExactTokensForTokensCall {
        amountIn: U256::from(1_000_000u64),
        amountOutMin: U256::from(990_000u64),
        path,
        to: Address::with_last_byte(0xaa),
        deadline: U256::from(1_900_000_000u64),
    };
    RawTransaction {
        hash: hash(n),
        from: Address::with_last_byte(0xaa),
        to: Some(ROUTER),
        input: call.abi_encode().into(),
        gas_price,
    }
}

/// One scripted `subscribe_pending` result
pub enum Subscription {
    /// Stream yields these refs then ends
    Items(Vec<TxHash>),
    Fail(NodeError),
}

/// Node double. Once the subscription script runs out, every further
/// subscribe returns a stream that never yields.
#[derive(Default)]
pub struct MockNode {
    subscriptions: Mutex<VecDeque<Subscription>>,
    txs: Mutex<HashMap<TxHash, RawTransaction>>,
    included: Mutex<HashSet<TxHash>>,
    fetched: Mutex<Vec<TxHash>>,
    subscribe_calls: AtomicUsize,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, sub: Subscription) -> Self {
        self.subscriptions.lock().unwrap().push_back(sub);
        self
    }

    pub fn with_tx(self, tx: RawTransaction) -> Self {
        self.txs.lock().unwrap().insert(tx.hash, tx);
        self
    }

    pub fn with_included(self, hash: TxHash) -> Self {
        self.included.lock().unwrap().insert(hash);
        self
    }

    pub fn fetched(&self) -> Vec<TxHash> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeClient for MockNode {
    async fn subscribe_pending(&self) -> Result<PendingStream, NodeError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.subscriptions.lock().unwrap().pop_front();
        match next {
            Some(Subscription::Items(items)) => Ok(Box::pin(tokio_stream::iter(items))),
            Some(Subscription::Fail(e)) => Err(e),
            None => Ok(Box::pin(futures::stream::pending())),
        }
    }

    async fn fetch_transaction(&self, hash: TxHash) -> Result<Option<RawTransaction>, NodeError> {
        self.fetched.lock().unwrap().push(hash);
        Ok(self.txs.lock().unwrap().get(&hash).cloned())
    }

    async fn is_included(&self, hash: TxHash) -> Result<bool, NodeError> {
        Ok(self.included.lock().unwrap().contains(&hash))
    }
}

/// How `await_receipt` behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptScript {
    Success,
    Reverted,
    /// Never mined: sleeps out the full wait, then times out
    Never,
    Unavailable,
}

/// Signer double. Records every estimate and send request.
pub struct MockSigner {
    account: Address,
    start_nonce: u64,
    estimate_error: Mutex<Option<SignerError>>,
    send_error: Mutex<Option<SignerError>>,
    receipt: Mutex<ReceiptScript>,
    unavailable: AtomicBool,
    estimated: Mutex<Vec<TransactionRequest>>,
    sent: Mutex<Vec<TransactionRequest>>,
    receipt_waits: Mutex<Vec<Duration>>,
}

impl MockSigner {
    pub fn new(start_nonce: u64) -> Self {
        Self {
            account: OPERATOR,
            start_nonce,
            estimate_error: Mutex::new(None),
            send_error: Mutex::new(None),
            receipt: Mutex::new(ReceiptScript::Success),
            unavailable: AtomicBool::new(false),
            estimated: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            receipt_waits: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_estimate(self, err: SignerError) -> Self {
        *self.estimate_error.lock().unwrap() = Some(err);
        self
    }

    pub fn fail_send(self, err: SignerError) -> Self {
        *self.send_error.lock().unwrap() = Some(err);
        self
    }

    pub fn receipts(self, script: ReceiptScript) -> Self {
        *self.receipt.lock().unwrap() = script;
        self
    }

    /// Every call from now on fails with `Unavailable`
    pub fn revoke(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn estimated(&self) -> Vec<TransactionRequest> {
        self.estimated.lock().unwrap().clone()
    }

    pub fn receipt_waits(&self) -> Vec<Duration> {
        self.receipt_waits.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), SignerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SignerError::Unavailable("session revoked".to_string()));
        }
        Ok(())
    }
}

pub fn tx_hash_for_nonce(nonce: u64) -> TxHash {
    keccak256(nonce.to_be_bytes())
}

#[async_trait]
impl Signer for MockSigner {
    fn current_account(&self) -> Address {
        self.account
    }

    async fn transaction_count(&self, _account: Address) -> Result<u64, SignerError> {
        self.check_available()?;
        Ok(self.start_nonce)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, SignerError> {
        self.check_available()?;
        self.estimated.lock().unwrap().push(tx.clone());
        match self.estimate_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(180_000),
        }
    }

    async fn sign_and_send(&self, tx: TransactionRequest) -> Result<TxHash, SignerError> {
        self.check_available()?;
        let nonce = tx.nonce.unwrap_or_default();
        self.sent.lock().unwrap().push(tx);
        match self.send_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(tx_hash_for_nonce(nonce)),
        }
    }

    async fn await_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt, SignerError> {
        self.receipt_waits.lock().unwrap().push(timeout);
        let script = *self.receipt.lock().unwrap();
        match script {
            ReceiptScript::Success | ReceiptScript::Reverted => Ok(Receipt {
                tx_hash,
                success: script == ReceiptScript::Success,
                block_number: Some(100),
            }),
            ReceiptScript::Never => {
                tokio::time::sleep(timeout).await;
                Err(SignerError::Timeout)
            }
            ReceiptScript::Unavailable => Err(SignerError::Unavailable("connection lost".to_string())),
        }
    }
}
