//! Race Module
//!
//! Purpose:
//!     Turn a race candidate into a signed competing transaction and follow
//!     it to a terminal outcome.
//!
//! Architecture:
//!     bid.rs        — gas price bump + deadline
//!     nonce.rs      — exclusive nonce reservation shared by concurrent races
//!     types.rs      — CompetingTransactionSpec, RaceOutcome, RaceReport
//!     submitter.rs  — estimate, sign, send, await receipt
//!     journal.rs    — JSONL outcome log

pub mod bid;
pub mod journal;
pub mod nonce;
pub mod submitter;
pub mod types;

pub use bid::{Bid, BidStrategy};
pub use journal::{OutcomeJournal, OutcomeRecord};
pub use nonce::{NonceRelease, NonceSequencer};
pub use submitter::RaceSubmitter;
pub use types::{CompetingTransactionSpec, RaceOutcome, RaceReport};
