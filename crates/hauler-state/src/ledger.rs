use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::StateError;
use crate::fs::{AtomicWriteOptions, atomic_write};

/// Persisted set of item ids that have reached terminal success.
///
/// Membership is the only "already handled" signal the pipeline trusts:
/// local artifacts are deleted once relocated, so their absence says
/// nothing. The file is a flat JSON array of id strings, rewritten in full
/// and fsynced on every [`record`](Ledger::record) before the call
/// returns. Entries are never removed.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl Ledger {
    /// Load the ledger at `path`, starting empty when the file is missing.
    ///
    /// A file that exists but cannot be read or parsed also starts a fresh
    /// ledger, with a loud warning: previously completed items may be
    /// reattempted, which is the accepted tradeoff over refusing to run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<String>>(&bytes) {
                Ok(list) => list.into_iter().collect(),
                Err(err) => {
                    warn!(
                        path = %path.display(), %err,
                        "completion ledger is corrupt, starting from empty"
                    );
                    BTreeSet::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(err) => {
                warn!(
                    path = %path.display(), %err,
                    "completion ledger is unreadable, starting from empty"
                );
                BTreeSet::new()
            }
        };
        Self { path, ids }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record `id` as durably done.
    ///
    /// The whole file is rewritten and fsynced before this returns: a
    /// crash right after cannot lose the record, and a crash right before
    /// never marks the item done.
    pub fn record(&mut self, id: impl Into<String>) -> Result<(), StateError> {
        self.ids.insert(id.into());
        self.persist()
    }

    fn persist(&self) -> Result<(), StateError> {
        let list: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        let body = serde_json::to_vec_pretty(&list).map_err(|source| StateError::Encode {
            path: self.path.clone(),
            source,
        })?;
        atomic_write(&self.path, &body, AtomicWriteOptions::new().sync(true))
    }
}
