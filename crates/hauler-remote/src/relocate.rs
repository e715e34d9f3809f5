use std::path::Path;

use tracing::{error, info, warn};

use crate::error::RelocateError;
use crate::store::RemoteStore;

/// What to do with the local copy when remote verification fails.
///
/// `DeleteLocal` bounds local disk usage at the cost of discarding the
/// only copy of data the remote failed to verify; `KeepLocal` preserves it
/// and leaves the item pending with the disk headroom that implies. Under
/// both, the item is not recorded as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyFailurePolicy {
    #[default]
    DeleteLocal,
    KeepLocal,
}

/// A verified relocation: the remote copy is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocated {
    pub bytes: u64,
    /// False when the verified local copy could not be deleted. The
    /// remote determination stands; the leftover file is logged.
    pub local_removed: bool,
}

/// Drives the copy-verify-delete protocol against a [`RemoteStore`].
pub struct Relocator<S: RemoteStore> {
    store: S,
    policy: VerifyFailurePolicy,
}

impl<S: RemoteStore> Relocator<S> {
    pub fn new(store: S, policy: VerifyFailurePolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Push `local` to the remote store, verify the remote byte count
    /// against the local one, and only then delete the local file.
    ///
    /// The local size is captured before the copy starts and is the
    /// verification reference: the caller must not mutate `local` once
    /// this is called, and must call at most once per completed transfer.
    pub async fn relocate(&self, local: &Path) -> Result<Relocated, RelocateError> {
        let expected = tokio::fs::metadata(local)
            .await
            .map_err(|source| RelocateError::LocalRead {
                path: local.to_path_buf(),
                source,
            })?
            .len();

        self.store.copy(local).await?;

        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote_size = match self.store.size(&file_name).await {
            Ok(size) => Some(size),
            Err(err) => {
                warn!(%err, file = %file_name, "remote size query failed");
                None
            }
        };

        if remote_size != Some(expected) || expected == 0 {
            let local_removed = match self.policy {
                VerifyFailurePolicy::DeleteLocal => match tokio::fs::remove_file(local).await {
                    Ok(()) => true,
                    Err(err) => {
                        error!(
                            path = %local.display(), %err,
                            "could not delete local copy after verification failure"
                        );
                        false
                    }
                },
                VerifyFailurePolicy::KeepLocal => false,
            };
            error!(
                path = %local.display(),
                expected,
                remote = ?remote_size,
                local_removed,
                "remote verification failed"
            );
            return Err(RelocateError::VerifyFailed {
                expected,
                actual: remote_size,
                local_removed,
            });
        }

        let local_removed = match tokio::fs::remove_file(local).await {
            Ok(()) => true,
            Err(err) => {
                // The verified remote copy stays authoritative either way.
                error!(path = %local.display(), %err, "relocated but local delete failed");
                false
            }
        };
        info!(path = %local.display(), bytes = expected, "relocated to remote store");

        Ok(Relocated {
            bytes: expected,
            local_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// In-memory store with a scriptable size answer.
    struct MockStore {
        copied: Mutex<Vec<PathBuf>>,
        copy_result: Option<RelocateError>,
        size_result: Result<u64, ()>,
    }

    impl MockStore {
        fn reporting_size(size: u64) -> Self {
            Self {
                copied: Mutex::new(Vec::new()),
                copy_result: None,
                size_result: Ok(size),
            }
        }
    }

    impl RemoteStore for MockStore {
        async fn copy(&self, local: &Path) -> Result<(), RelocateError> {
            if let Some(err) = &self.copy_result {
                return Err(match err {
                    RelocateError::CopyFailed { code } => RelocateError::CopyFailed { code: *code },
                    _ => RelocateError::SizeQuery("unexpected".into()),
                });
            }
            self.copied.lock().unwrap().push(local.to_path_buf());
            Ok(())
        }

        async fn size(&self, _file_name: &str) -> Result<u64, RelocateError> {
            self.size_result
                .map_err(|()| RelocateError::SizeQuery("remote unreachable".into()))
        }
    }

    fn artifact(dir: &Path, len: usize) -> PathBuf {
        let path = dir.join("artifact.zip");
        std::fs::write(&path, vec![0xA5; len]).unwrap();
        path
    }

    #[tokio::test]
    async fn relocates_when_sizes_match() {
        let dir = tempdir().unwrap();
        let local = artifact(dir.path(), 1000);
        let relocator = Relocator::new(
            MockStore::reporting_size(1000),
            VerifyFailurePolicy::DeleteLocal,
        );

        let outcome = relocator.relocate(&local).await.unwrap();

        assert_eq!(
            outcome,
            Relocated {
                bytes: 1000,
                local_removed: true
            }
        );
        assert!(!local.exists());
        assert_eq!(relocator.store().copied.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn size_disagreement_fails_verification_and_deletes() {
        let dir = tempdir().unwrap();
        let local = artifact(dir.path(), 1000);
        let relocator = Relocator::new(
            MockStore::reporting_size(999),
            VerifyFailurePolicy::DeleteLocal,
        );

        let err = relocator.relocate(&local).await.unwrap_err();

        assert!(matches!(
            err,
            RelocateError::VerifyFailed {
                expected: 1000,
                actual: Some(999),
                local_removed: true
            }
        ));
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn keep_local_policy_preserves_the_file() {
        let dir = tempdir().unwrap();
        let local = artifact(dir.path(), 1000);
        let relocator = Relocator::new(
            MockStore::reporting_size(999),
            VerifyFailurePolicy::KeepLocal,
        );

        let err = relocator.relocate(&local).await.unwrap_err();

        assert!(matches!(
            err,
            RelocateError::VerifyFailed {
                local_removed: false,
                ..
            }
        ));
        assert!(local.exists());
    }

    #[tokio::test]
    async fn copy_failure_never_touches_the_local_file() {
        let dir = tempdir().unwrap();
        let local = artifact(dir.path(), 500);
        let store = MockStore {
            copied: Mutex::new(Vec::new()),
            copy_result: Some(RelocateError::CopyFailed { code: Some(3) }),
            size_result: Ok(500),
        };
        let relocator = Relocator::new(store, VerifyFailurePolicy::DeleteLocal);

        let err = relocator.relocate(&local).await.unwrap_err();

        assert!(matches!(err, RelocateError::CopyFailed { code: Some(3) }));
        assert!(local.exists());
    }

    #[tokio::test]
    async fn unreachable_remote_size_is_a_verification_failure() {
        let dir = tempdir().unwrap();
        let local = artifact(dir.path(), 500);
        let store = MockStore {
            copied: Mutex::new(Vec::new()),
            copy_result: None,
            size_result: Err(()),
        };
        let relocator = Relocator::new(store, VerifyFailurePolicy::DeleteLocal);

        let err = relocator.relocate(&local).await.unwrap_err();

        assert!(matches!(
            err,
            RelocateError::VerifyFailed { actual: None, .. }
        ));
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn zero_byte_artifacts_never_verify() {
        let dir = tempdir().unwrap();
        let local = artifact(dir.path(), 0);
        let relocator = Relocator::new(
            MockStore::reporting_size(0),
            VerifyFailurePolicy::KeepLocal,
        );

        let err = relocator.relocate(&local).await.unwrap_err();
        assert!(matches!(
            err,
            RelocateError::VerifyFailed { expected: 0, .. }
        ));
    }

    #[tokio::test]
    async fn missing_local_file_is_reported() {
        let dir = tempdir().unwrap();
        let relocator = Relocator::new(
            MockStore::reporting_size(1),
            VerifyFailurePolicy::DeleteLocal,
        );

        let err = relocator
            .relocate(&dir.path().join("never-downloaded.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelocateError::LocalRead { .. }));
    }
}
