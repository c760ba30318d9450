// Core configuration surface for the racer.
// Loaded once at startup (see config.rs) and shared read-only afterwards.

use alloy::primitives::{Address, U256};
use serde::Deserialize;
use std::time::Duration;

/// Wei per gwei
pub const GWEI: u128 = 1_000_000_000;

/// Bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    // Network
    pub rpc_url: String,
    pub chain_id: u64,
    #[serde(default = "default_chain_name")]
    pub chain_name: String,

    // Wallet (handed straight to the signer collaborator)
    pub private_key: String,

    // Target
    /// Exchange router whose pending swaps are raced
    pub target_router: Address,
    /// Token that must appear somewhere in the swap path
    pub target_token: Address,

    // Bidding
    #[serde(default = "default_floor_gas_price_gwei")]
    pub floor_gas_price_gwei: u64,
    #[serde(default = "default_bid_bump_percent")]
    pub bid_bump_percent: u64,
    #[serde(default = "default_race_deadline_secs")]
    pub race_deadline_secs: u64,
    /// Overrides the mirrored amountIn of the competing swap
    #[serde(default)]
    pub race_amount_in: Option<U256>,

    // Timing
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    /// Consecutive failed resubscribes before giving up (0 = never)
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,

    // Duplicate suppression
    #[serde(default = "default_dedupe_ttl_ms")]
    pub dedupe_ttl_ms: u64,
    #[serde(default = "default_dedupe_capacity")]
    pub dedupe_capacity: usize,

    // Reporting
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default)]
    pub outcome_log_dir: Option<String>,
}

pub(crate) fn default_chain_name() -> String { "mainnet".to_string() }
pub(crate) fn default_floor_gas_price_gwei() -> u64 { 5 }
pub(crate) fn default_bid_bump_percent() -> u64 { 10 }
pub(crate) fn default_race_deadline_secs() -> u64 { 60 }
pub(crate) fn default_fetch_timeout_ms() -> u64 { 2_000 }
pub(crate) fn default_receipt_poll_ms() -> u64 { 500 }
pub(crate) fn default_reconnect_base_ms() -> u64 { 500 }
pub(crate) fn default_reconnect_max_ms() -> u64 { 30_000 }
pub(crate) fn default_max_reconnects() -> u32 { 50 }
pub(crate) fn default_dedupe_ttl_ms() -> u64 { 60_000 }
pub(crate) fn default_dedupe_capacity() -> usize { 100_000 }
pub(crate) fn default_stats_interval_secs() -> u64 { 60 }

impl BotConfig {
    /// Floor gas price in wei, used when the observed tx reports no price
    pub fn floor_gas_price_wei(&self) -> u128 {
        self.floor_gas_price_gwei as u128 * GWEI
    }

    pub fn race_deadline(&self) -> Duration {
        Duration::from_secs(self.race_deadline_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn dedupe_ttl(&self) -> Duration {
        Duration::from_millis(self.dedupe_ttl_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }
}

#[cfg(test)]
impl BotConfig {
    /// Minimal config for unit tests: router 0x...01, token 0x...02
    pub(crate) fn for_tests() -> Self {
        Self {
            rpc_url: "ws://127.0.0.1:8546".to_string(),
            chain_id: 1,
            chain_name: "testnet".to_string(),
            private_key: String::new(),
            target_router: Address::with_last_byte(0x01),
            target_token: Address::with_last_byte(0x02),
            floor_gas_price_gwei: default_floor_gas_price_gwei(),
            bid_bump_percent: default_bid_bump_percent(),
            race_deadline_secs: default_race_deadline_secs(),
            race_amount_in: None,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            receipt_poll_ms: default_receipt_poll_ms(),
            reconnect_base_ms: 10,
            reconnect_max_ms: 100,
            max_reconnects: 3,
            dedupe_ttl_ms: default_dedupe_ttl_ms(),
            dedupe_capacity: 1_000,
            stats_interval_secs: default_stats_interval_secs(),
            outcome_log_dir: None,
        }
    }
}
