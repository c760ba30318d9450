//! Mempool Watcher
//!
//! Purpose:
//!     Own the pending-transaction subscription. Every fresh ref is handed
//!     to the race pipeline in its own task; the loop itself never waits on
//!     a race.
//!
//! Dependencies:
//!     - tokio (select!, spawn, mpsc, interval)
//!     - tokio-stream (StreamExt on the pending stream)
//!
//! Notes:
//!     - Stream end or subscribe failure → resubscribe with exponential
//!       backoff. `max_reconnects` consecutive failed subscribes is terminal.
//!     - A unit that loses the signer reports back over a channel and the
//!       watcher stops. In-flight units are left to finish on their own.

use alloy::primitives::TxHash;
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, trace, warn};

use crate::error::{NodeError, RaceError, WatchError};
use crate::node::NodeClient;
use crate::pipeline::RacePipeline;
use crate::signer::Signer;
use crate::types::BotConfig;

use super::seen::SeenTracker;

#[derive(Debug, Clone, Copy)]
pub struct ReconnectConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive failed subscribes before giving up (0 = never)
    pub max_attempts: u32,
}

impl ReconnectConfig {
    pub fn new(base_ms: u64, max_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
            max_attempts,
        }
    }
}

pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    let next_ms = current.as_millis().saturating_mul(2) as u64;
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(next_ms.min(max_ms))
}

pub struct MempoolWatcher<S: ?Sized, N: ?Sized> {
    node: Arc<N>,
    pipeline: Arc<RacePipeline<S, N>>,
    seen: SeenTracker,
    reconnect: ReconnectConfig,
    stats_interval: Duration,
}

impl<S, N> MempoolWatcher<S, N>
where
    S: Signer + ?Sized + 'static,
    N: NodeClient + ?Sized + 'static,
{
    pub fn new(
        node: Arc<N>,
        pipeline: Arc<RacePipeline<S, N>>,
        seen: SeenTracker,
        reconnect: ReconnectConfig,
        stats_interval: Duration,
    ) -> Self {
        Self {
            node,
            pipeline,
            seen,
            reconnect,
            stats_interval,
        }
    }

    pub fn from_config(config: &BotConfig, node: Arc<N>, pipeline: Arc<RacePipeline<S, N>>) -> Self {
        Self::new(
            node,
            pipeline,
            SeenTracker::new(config.dedupe_ttl(), config.dedupe_capacity),
            ReconnectConfig::new(
                config.reconnect_base_ms,
                config.reconnect_max_ms,
                config.max_reconnects,
            ),
            config.stats_interval(),
        )
    }

    /// Run until `shutdown` resolves (→ `Ok`) or a fatal condition is hit.
    pub async fn watch<F>(mut self, shutdown: F) -> Result<(), WatchError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel::<RaceError>();

        let mut stats_tick = interval(self.stats_interval);
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick
        stats_tick.tick().await;

        let mut failures = 0u32;
        let mut delay = self.reconnect.base_delay;

        loop {
            let subscribed = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Mempool watcher: shutdown requested");
                    return Ok(());
                }
                result = self.node.subscribe_pending() => result,
            };

            let mut stream = match subscribed {
                Ok(stream) => {
                    failures = 0;
                    delay = self.reconnect.base_delay;
                    info!("Mempool: pending subscription active");
                    stream
                }
                Err(NodeError::Unauthorized(reason)) => {
                    error!("Mempool: subscription refused, not retrying: {}", reason);
                    return Err(WatchError::SubscriptionImpossible(reason));
                }
                Err(e) => {
                    failures += 1;
                    let max = self.reconnect.max_attempts;
                    if max > 0 && failures >= max {
                        error!("Mempool: {} reconnects exhausted, giving up: {}", failures, e);
                        return Err(WatchError::ReconnectsExhausted {
                            attempts: failures,
                            last: e.to_string(),
                        });
                    }
                    warn!(
                        "Mempool subscribe error (attempt {}/{}): {}, retrying in {}ms",
                        failures,
                        if max == 0 { "∞".to_string() } else { max.to_string() },
                        e,
                        delay.as_millis()
                    );
                    if let ControlFlow::Break(stop) = Self::pause(&mut shutdown, &mut fatal_rx, delay).await {
                        return stop;
                    }
                    delay = next_backoff(delay, self.reconnect.max_delay);
                    continue;
                }
            };

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        info!("Mempool watcher: shutdown requested, in-flight races left running");
                        return Ok(());
                    }
                    Some(fatal) = fatal_rx.recv() => {
                        error!("Mempool watcher stopping: {}", fatal);
                        return Err(fatal.into());
                    }
                    maybe_ref = stream.next() => match maybe_ref {
                        Some(hash) => self.dispatch(hash, &fatal_tx),
                        None => {
                            warn!("Mempool pending stream ended, resubscribing in {}ms", delay.as_millis());
                            break;
                        }
                    },
                    _ = stats_tick.tick() => {
                        self.seen.cleanup();
                        self.pipeline
                            .stats()
                            .log_summary(self.seen.tracking_count(), self.pipeline.in_flight());
                    }
                }
            }

            drop(stream);
            if let ControlFlow::Break(stop) = Self::pause(&mut shutdown, &mut fatal_rx, delay).await {
                return stop;
            }
            delay = next_backoff(delay, self.reconnect.max_delay);
        }
    }

    /// Sleep before resubscribing, still honoring shutdown and fatal reports.
    /// `Break` carries the value `watch` should return.
    async fn pause<F>(
        shutdown: &mut Pin<&mut F>,
        fatal_rx: &mut mpsc::UnboundedReceiver<RaceError>,
        delay: Duration,
    ) -> ControlFlow<Result<(), WatchError>>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = shutdown.as_mut() => {
                info!("Mempool watcher: shutdown requested");
                ControlFlow::Break(Ok(()))
            }
            Some(fatal) = fatal_rx.recv() => {
                error!("Mempool watcher stopping: {}", fatal);
                ControlFlow::Break(Err(fatal.into()))
            }
            _ = sleep(delay) => ControlFlow::Continue(()),
        }
    }

    fn dispatch(&mut self, hash: TxHash, fatal_tx: &mpsc::UnboundedSender<RaceError>) {
        let stats = self.pipeline.stats();
        stats.record_seen();

        if !self.seen.first_sighting(hash) {
            trace!(%hash, "duplicate ref dropped");
            stats.record_duplicate();
            return;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let fatal_tx = fatal_tx.clone();
        let seen_at = std::time::Instant::now();
        tokio::spawn(async move {
            if let Err(e) = pipeline.handle(hash, seen_at).await {
                if fatal_tx.send(e).is_err() {
                    debug!(%hash, "watcher already stopped, fatal report dropped");
                }
            }
        });
    }
}
