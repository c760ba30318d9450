//! Mempool Racer
//!
//! Main entry point. Subscribes to the node's pending transactions, picks
//! out swaps on the target router whose path touches the target token, and
//! races each one with an outbidding swap of our own.
//!
//! Architecture:
//! - Two WS connections: one for the pending subscription + lookups, one
//!   carrying the wallet for estimate/sign/send/receipt
//! - Nonce sequencer seeded from the on-chain transaction count
//! - One spawned task per fresh pending ref; the watch loop never blocks on a race
//! - SIGINT/SIGTERM stop new dispatches; in-flight races are not awaited
//! - Signer loss, refused subscription or exhausted reconnects exit non-zero

use alloy::network::EthereumWallet;
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use mempool_racer::config::{load_config_from_file, load_config_from_toml};
use mempool_racer::mempool::MempoolWatcher;
use mempool_racer::node::AlloyNode;
use mempool_racer::pipeline::RacePipeline;
use mempool_racer::race::NonceSequencer;
use mempool_racer::signer::WalletSigner;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Mempool swap racer
#[derive(Parser)]
#[command(name = "mempool-racer")]
struct Args {
    /// Chain whose .env.<chain> file is loaded
    #[arg(short, long, env = "CHAIN", default_value = "mainnet")]
    chain: String,

    /// TOML config file (replaces the .env file when given)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }
}

/// First 40 characters of the RPC URL, enough to tell endpoints apart
/// without printing the API key
fn url_preview(url: &str) -> String {
    url.chars().take(40).collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    let chain = args.chain.to_lowercase();

    let config = match &args.config {
        Some(path) => {
            let config = load_config_from_toml(path)?;
            info!("Configuration loaded from {} (chain_id: {})", path.display(), config.chain_id);
            config
        }
        None => {
            let env_file = format!(".env.{}", chain);
            let config = load_config_from_file(&env_file)?;
            info!("Configuration loaded from {} (chain_id: {})", env_file, config.chain_id);
            config
        }
    };

    info!("Mempool Racer starting on {}...", config.chain_name);
    info!("RPC URL: {}", url_preview(&config.rpc_url));
    info!("Target router: {:?}", config.target_router);
    info!("Target token: {:?}", config.target_token);
    info!(
        "Bid: +{}% over observed, floor {} gwei, deadline {}s",
        config.bid_bump_percent, config.floor_gas_price_gwei, config.race_deadline_secs
    );

    // Wallet
    let key: PrivateKeySigner = config
        .private_key
        .trim_start_matches("0x")
        .parse()
        .context("Invalid PRIVATE_KEY")?;
    let account = key.address();
    let wallet = EthereumWallet::from(key);
    info!("Operator account: {:?}", account);

    // Provider 1: pending subscription + tx / receipt lookups
    // Provider 2: wallet-backed estimate, send and receipt polling
    info!("Connecting via WebSocket (subscription + signer)...");
    let node_provider = ProviderBuilder::new()
        .connect_ws(WsConnect::new(&config.rpc_url))
        .await
        .context("Failed to connect node WebSocket")?;
    let signer_provider = ProviderBuilder::new()
        .disable_recommended_fillers()
        .wallet(wallet)
        .connect_ws(WsConnect::new(&config.rpc_url))
        .await
        .context("Failed to connect signer WebSocket")?;

    let block = node_provider.get_block_number().await?;
    info!("Connected! Current block: {} (2 WS connections)", block);

    let node = Arc::new(AlloyNode::new(node_provider, config.fetch_timeout()));
    let signer = Arc::new(WalletSigner::new(
        signer_provider,
        account,
        config.receipt_poll_interval(),
    ));

    let nonces = Arc::new(
        NonceSequencer::from_signer(signer.as_ref())
            .await
            .context("Failed to read operator nonce")?,
    );
    info!("Starting nonce: {}", nonces.next_fresh());

    let pipeline = Arc::new(RacePipeline::from_config(
        &config,
        Arc::clone(&node),
        signer,
        nonces,
    )?);
    let watcher = MempoolWatcher::from_config(&config, node, Arc::clone(&pipeline));

    // SIGINT / SIGTERM → stop dispatching
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    let shutdown = async move {
        if let Some(sig) = signals.next().await {
            info!("Received signal {} - shutting down", sig);
        }
    };

    let result = watcher.watch(shutdown).await;
    signals_handle.close();

    pipeline.stats().log_summary(0, pipeline.in_flight());

    match result {
        Ok(()) => {
            info!("Mempool Racer stopped");
            Ok(())
        }
        Err(e) => {
            error!("Mempool Racer stopped on fatal error: {}", e);
            Err(e.into())
        }
    }
}
