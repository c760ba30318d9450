//! Bid strategy: outbid the observed gas price and set a short deadline.
//!
//! price    = observed * (100 + bump) / 100   (integer, truncating)
//! deadline = now + window                     (unix seconds)
//!
//! Pure function of its inputs; no network, no shared state.

use std::time::Duration;

/// Default premium over the observed price
pub const DEFAULT_BUMP_PERCENT: u64 = 10;

/// Default deadline window
pub const DEFAULT_DEADLINE_WINDOW: Duration = Duration::from_secs(60);

/// Price and deadline for a competing transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bid {
    /// Gas price in wei
    pub price: u128,
    /// Absolute deadline, seconds since epoch
    pub deadline: u64,
}

impl Bid {
    /// Time left until the deadline as seen from `now` (unix seconds)
    pub fn remaining(&self, now: u64) -> Duration {
        Duration::from_secs(self.deadline.saturating_sub(now))
    }
}

#[derive(Debug, Clone)]
pub struct BidStrategy {
    /// Used when the node did not report a price (or reported 0)
    floor_price: u128,
    bump_percent: u64,
    window: Duration,
}

impl BidStrategy {
    pub fn new(floor_price: u128, bump_percent: u64, window: Duration) -> Self {
        Self {
            floor_price,
            bump_percent,
            window,
        }
    }

    /// 10% over the observed price, 60s deadline
    pub fn with_floor(floor_price: u128) -> Self {
        Self::new(floor_price, DEFAULT_BUMP_PERCENT, DEFAULT_DEADLINE_WINDOW)
    }

    pub fn floor_price(&self) -> u128 {
        self.floor_price
    }

    pub fn compute_bid(&self, observed_price: Option<u128>, now: u64) -> Bid {
        let price = match observed_price {
            Some(observed) if observed > 0 => observed
                .saturating_mul(100 + self.bump_percent as u128)
                / 100,
            _ => self.floor_price,
        };

        Bid {
            price,
            deadline: now.saturating_add(self.window.as_secs()),
        }
    }
}
