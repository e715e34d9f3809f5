use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The server demanded credentials (401/403). Surfaced to the caller,
    /// never retried automatically.
    #[error("server requires authentication (HTTP {0})")]
    AuthRequired(u16),

    #[error("server rejected the request (HTTP {0})")]
    ServerRejected(u16),

    #[error("network failure: {0}")]
    Network(String),

    /// The stream ended with a different byte count than the server
    /// declared. The file is left on disk so the next attempt can resume.
    #[error("size mismatch: expected {expected} bytes, have {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("file I/O error: {0}")]
    Io(#[from] io::Error),
}
