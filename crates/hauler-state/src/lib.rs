//! Persistent run state for Hauler.
//!
//! Two files survive between runs: the completion ledger (which items are
//! durably done) and the catalog cache snapshot. Both are small, rewritten
//! whole on every mutation, and never appended to, so the only persistence
//! primitive needed is [`fs::atomic_write`].

mod error;
pub mod fs;
mod ledger;

pub use error::StateError;
pub use ledger::Ledger;
