use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelocateError {
    /// The remote-store binary is not on PATH. Fatal at startup: no item
    /// can succeed without it.
    #[error("remote store tool `{0}` not found in PATH")]
    ToolMissing(String),

    #[error("failed to run {tool}: {source}")]
    Tool {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The copy subcommand exited nonzero (`None` when killed by signal).
    /// The local file is untouched and the item stays pending.
    #[error("remote copy exited with status {code:?}")]
    CopyFailed { code: Option<i32> },

    #[error("remote size query failed: {0}")]
    SizeQuery(String),

    /// Remote and local byte counts disagree after the copy, or the
    /// remote size could not be read. The item is never recorded as done;
    /// `local_removed` says what the cleanup policy did with the file.
    #[error(
        "remote verification failed: local {expected} bytes, remote reported {actual:?}"
    )]
    VerifyFailed {
        expected: u64,
        actual: Option<u64>,
        local_removed: bool,
    },

    #[error("failed to read {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
