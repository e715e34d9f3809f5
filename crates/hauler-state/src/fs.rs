//! Whole-file persistence primitive.
//!
//! The write path is: temp file in the destination directory, optional
//! fsync, rename over the target. A crash leaves either the old file or
//! the new one, never a torn write.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::StateError;

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    /// Fsync the temp file before the rename. Required for durability
    /// claims; skip only for data that is cheap to recompute.
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<(), StateError> {
    let path = path.as_ref();
    let write_err = |source| StateError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .ok_or_else(|| write_err(std::io::Error::other("no parent directory")))?;

    // Same directory as the target so the rename cannot cross filesystems.
    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(content).map_err(write_err)?;

    if options.sync {
        tmp.as_file().sync_all().map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>, StateError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| StateError::Read {
        path: path.to_path_buf(),
        source,
    })
}
