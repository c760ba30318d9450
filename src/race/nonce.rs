//! Nonce sequencer
//!
//! The signer's nonce is the only mutable state shared between concurrent
//! races. Every race reserves exactly one nonce and releases it exactly once:
//!   - `Consumed`: the tx was handed to the network, the nonce is gone
//!   - `Unused`:   the race failed before broadcast, the nonce goes back to
//!                 the pool and the lowest returned value is handed out next
//! A nonce is never handed out while it is still reserved.

use alloy::primitives::Address;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::SignerError;
use crate::signer::Signer;

/// How a reserved nonce is given back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceRelease {
    /// Broadcast was attempted; the nonce is spent
    Consumed,
    /// Failed strictly before broadcast; reuse it
    Unused,
}

#[derive(Debug)]
struct NonceState {
    /// Next never-issued nonce
    next: u64,
    /// Released-unused nonces waiting for reuse
    returned: BTreeSet<u64>,
    /// Reserved and not yet released
    outstanding: HashSet<u64>,
}

#[derive(Debug)]
pub struct NonceSequencer {
    state: Mutex<NonceState>,
}

impl NonceSequencer {
    pub fn new(start: u64) -> Self {
        Self {
            state: Mutex::new(NonceState {
                next: start,
                returned: BTreeSet::new(),
                outstanding: HashSet::new(),
            }),
        }
    }

    /// Seed from the signer's on-chain transaction count
    pub async fn from_signer<S: Signer + ?Sized>(signer: &S) -> Result<Self, SignerError> {
        let account: Address = signer.current_account();
        let start = signer.transaction_count(account).await?;
        debug!(%account, start, "nonce sequencer seeded");
        Ok(Self::new(start))
    }

    fn lock(&self) -> MutexGuard<'_, NonceState> {
        // Critical sections never panic; recover the state if one somehow did
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Exclusive reservation. Never blocks across an await.
    pub fn reserve(&self) -> u64 {
        let mut state = self.lock();
        let nonce = match state.returned.pop_first() {
            Some(reused) => reused,
            None => {
                let fresh = state.next;
                state.next += 1;
                fresh
            }
        };
        state.outstanding.insert(nonce);
        nonce
    }

    pub fn release(&self, nonce: u64, how: NonceRelease) {
        let mut state = self.lock();
        if !state.outstanding.remove(&nonce) {
            warn!(nonce, ?how, "release of a nonce that is not reserved, ignoring");
            return;
        }
        if how == NonceRelease::Unused {
            state.returned.insert(nonce);
        }
    }

    /// Reserved and not yet released
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding.len()
    }

    /// The nonce a fresh reservation would get if nothing were returned
    pub fn next_fresh(&self) -> u64 {
        self.lock().next
    }
}
