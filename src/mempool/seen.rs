//! Mempool — Seen-ref tracker
//!
//! The pending stream does not deduplicate, and reconnects replay recent
//! hashes. A ref seen within the TTL is dropped before it costs a fetch.
//! Memory is bounded by periodic cleanup plus a hard capacity.

use alloy::primitives::TxHash;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub struct SeenTracker {
    /// tx_hash → time last seen
    seen: HashMap<TxHash, Instant>,
    ttl: Duration,
    capacity: usize,
}

impl SeenTracker {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            seen: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Returns true on the first sighting of `hash` within the TTL window.
    /// A repeat sighting refreshes the window and returns false.
    pub fn first_sighting(&mut self, hash: TxHash) -> bool {
        self.first_sighting_at(hash, Instant::now())
    }

    pub fn first_sighting_at(&mut self, hash: TxHash, now: Instant) -> bool {
        if let Some(last_seen) = self.seen.get_mut(&hash) {
            let fresh = now.saturating_duration_since(*last_seen) <= self.ttl;
            *last_seen = now;
            return !fresh;
        }

        if self.seen.len() >= self.capacity {
            self.cleanup_at(now);
            if self.seen.len() >= self.capacity {
                debug!(capacity = self.capacity, "seen tracker full, clearing");
                self.seen.clear();
            }
        }

        self.seen.insert(hash, now);
        true
    }

    /// Remove entries older than the TTL
    pub fn cleanup(&mut self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.seen
            .retain(|_, last_seen| now.saturating_duration_since(*last_seen) <= ttl);
    }

    /// Number of refs currently tracked
    pub fn tracking_count(&self) -> usize {
        self.seen.len()
    }
}
