use std::future::Future;
use std::path::Path;

use crate::error::RelocateError;

/// Remote storage operations used by the relocation protocol.
///
/// The production implementation shells out to an rclone-style binary;
/// tests substitute an in-memory store.
pub trait RemoteStore: Send + Sync {
    /// Copy `local` into the configured remote destination under its own
    /// file name, streaming the tool's progress output to the log.
    fn copy(&self, local: &Path) -> impl Future<Output = Result<(), RelocateError>> + Send;

    /// Byte size of the remote object named `file_name`.
    fn size(&self, file_name: &str) -> impl Future<Output = Result<u64, RelocateError>> + Send;
}
