//! ezpoll-core: poll registry and ballot engine for the ezpoll ledger.
//!
//! The crate has two layers:
//! - `Registry`: the sequential state machine. Polls, candidate tallies and
//!   per-poll ballot markers; every operation validates, then mutates, then
//!   reports its events.
//! - `Ledger`: signed transactions on top of the registry, with per-sender
//!   nonces against replay and a hash-chained journal for audit.

mod hash;
mod error;
mod identity;
mod poll;
mod event;
pub mod config;
mod registry;
pub mod tally;
mod transaction;
mod ledger;

pub use hash::Hash;
pub use error::{Error, ErrorKind, Result};
pub use identity::Identity;
pub use poll::{Candidate, CandidateId, Poll, PollId};
pub use event::{Event, Outcome};
pub use config::{LedgerConfig, Limits};
pub use registry::{Operation, Output, Registry};
pub use tally::{DashboardStats, PollTally};
pub use transaction::Transaction;
pub use ledger::{Journal, JournalEntry, Ledger, Receipt};

/// Re-export for convenience
pub use ed25519_dalek::{SigningKey, VerifyingKey};
