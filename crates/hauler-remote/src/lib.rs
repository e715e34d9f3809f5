//! Relocation of completed artifacts to remote storage.
//!
//! The protocol is copy, verify, delete, in that order, each step gated on
//! the one before it. The remote copy becomes authoritative only once its
//! reported byte count matches the local file; until then the local file
//! is the only copy that counts and a failed copy never removes it.

mod error;
mod relocate;
mod store;
mod tool;

pub use error::RelocateError;
pub use relocate::{Relocated, Relocator, VerifyFailurePolicy};
pub use store::RemoteStore;
pub use tool::ToolStore;
