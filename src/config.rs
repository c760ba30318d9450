//! Configuration management
//! Load settings from a chain-specific .env file (or a TOML file)

use crate::types;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::str::FromStr;

// Re-export BotConfig for external access
pub use crate::types::BotConfig;
use alloy::primitives::{Address, U256};

/// Load config from `.env` in the working directory plus the process environment
pub fn load_config() -> Result<BotConfig> {
    dotenv::dotenv().ok();
    from_env()
}

/// Load config from a specific dotenv file (e.g. `.env.mainnet`).
/// Variables already present in the process environment take precedence.
pub fn load_config_from_file(path: &str) -> Result<BotConfig> {
    dotenv::from_filename(path).with_context(|| format!("Failed to load env file: {}", path))?;
    from_env()
}

/// Load config from a TOML file with snake_case keys matching `BotConfig`
pub fn load_config_from_toml<P: AsRef<Path>>(path: P) -> Result<BotConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    let config: BotConfig =
        toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

    Ok(config)
}

fn from_env() -> Result<BotConfig> {
    Ok(BotConfig {
        rpc_url: required("RPC_URL")?,
        chain_id: parse_required("CHAIN_ID")?,
        chain_name: std::env::var("CHAIN_NAME").unwrap_or_else(|_| types::default_chain_name()),

        private_key: required("PRIVATE_KEY")?,

        target_router: address("TARGET_ROUTER")?,
        target_token: address("TARGET_TOKEN")?,

        floor_gas_price_gwei: parse_or("FLOOR_GAS_PRICE_GWEI", types::default_floor_gas_price_gwei())?,
        bid_bump_percent: parse_or("BID_BUMP_PERCENT", types::default_bid_bump_percent())?,
        race_deadline_secs: parse_or("RACE_DEADLINE_SECS", types::default_race_deadline_secs())?,
        race_amount_in: parse_optional::<U256>("RACE_AMOUNT_IN")?,

        fetch_timeout_ms: parse_or("FETCH_TIMEOUT_MS", types::default_fetch_timeout_ms())?,
        receipt_poll_ms: parse_or("RECEIPT_POLL_MS", types::default_receipt_poll_ms())?,
        reconnect_base_ms: parse_or("RECONNECT_BASE_MS", types::default_reconnect_base_ms())?,
        reconnect_max_ms: parse_or("RECONNECT_MAX_MS", types::default_reconnect_max_ms())?,
        max_reconnects: parse_or("MAX_RECONNECTS", types::default_max_reconnects())?,

        dedupe_ttl_ms: parse_or("DEDUPE_TTL_MS", types::default_dedupe_ttl_ms())?,
        dedupe_capacity: parse_or("DEDUPE_CAPACITY", types::default_dedupe_capacity())?,

        stats_interval_secs: parse_or("STATS_INTERVAL_SECS", types::default_stats_interval_secs())?,
        outcome_log_dir: std::env::var("OUTCOME_LOG_DIR").ok().filter(|s| !s.trim().is_empty()),
    })
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} not set", key))
}

fn parse_required<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = required(key)?;
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {}: '{}' ({})", key, raw, e))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("Invalid {}: '{}' ({})", key, raw, e)),
        _ => Ok(None),
    }
}

/// Addresses are accepted in any hex case; checksums are not enforced
fn address(key: &str) -> Result<Address> {
    parse_required::<Address>(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_toml_config_defaults() {
        let temp_dir = env::temp_dir().join("mempool_racer_config_test");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();
        let path = temp_dir.join("racer.toml");

        fs::write(
            &path,
            r#"
rpc_url = "ws://127.0.0.1:8546"
chain_id = 56
private_key = "0x0000000000000000000000000000000000000000000000000000000000000001"
target_router = "0x10ed43c718714eb63d5aa57b78b54704e256024e"
target_token = "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82"
race_amount_in = "1000000000000000000"
"#,
        )
        .unwrap();

        let config = load_config_from_toml(&path).unwrap();
        assert_eq!(config.chain_id, 56);
        assert_eq!(config.chain_name, "mainnet");
        assert_eq!(config.bid_bump_percent, 10);
        assert_eq!(config.race_deadline_secs, 60);
        assert_eq!(config.floor_gas_price_wei(), 5 * types::GWEI);
        assert_eq!(config.race_amount_in, Some(U256::from(1_000_000_000_000_000_000u128)));
        // Lowercase and checksummed spellings parse to the same bytes
        assert_eq!(
            config.target_router,
            "0x10ED43C718714eb63d5aA57B78B54704E256024E".parse::<Address>().unwrap()
        );
        assert!(config.outcome_log_dir.is_none());

        let _ = fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn test_toml_missing_required_key() {
        let temp_dir = env::temp_dir().join("mempool_racer_config_missing");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();
        let path = temp_dir.join("racer.toml");
        fs::write(&path, "rpc_url = \"ws://127.0.0.1:8546\"\nchain_id = 1\n").unwrap();

        assert!(load_config_from_toml(&path).is_err());

        let _ = fs::remove_dir_all(&temp_dir);
    }
}
