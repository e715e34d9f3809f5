//! Resumable HTTP downloading.
//!
//! The engine keeps no resume token: the destination file's byte length is
//! the cursor. A partial file left behind by a crash or a dropped
//! connection turns the next call into a `Range` request from that offset,
//! and a failure mid-stream leaves whatever bytes reached disk for the run
//! after that.

mod client;
mod engine;
mod error;
mod options;

#[cfg(feature = "reqwest")]
pub use client::ReqwestClient;
pub use client::{BoxStream, HttpClient, RangedResponse};
pub use engine::{FetchOutcome, Fetcher};
pub use error::FetchError;
pub use options::{FetchOptions, FetchPhase, Progress};
