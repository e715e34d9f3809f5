//! The sequential archiving pipeline.
//!
//! Items move through resolve, transfer, relocate, record. A failure at
//! any stage leaves the item out of the ledger and the loop moves to the
//! next one; nothing is retried within a run, the next invocation picks
//! up whatever is still pending. Ledger membership is the only "already
//! handled" signal, because successful items leave no local file behind.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use hauler_catalog::{CatalogError, Item, ResolvedTransfer, Resolver, artifact_file_name};
use hauler_fetch::{FetchError, FetchOptions, FetchOutcome, Fetcher, HttpClient, Progress};
use hauler_remote::{RelocateError, Relocator, RemoteStore};
use hauler_state::{Ledger, StateError};

use crate::report::{self, RunSummary};

/// Progress sink for the transfer stage, implemented by the CLI bar.
pub trait TransferUi: Send + Sync {
    fn on_progress(&self, file_name: &str, progress: &Progress);
    fn on_done(&self, file_name: &str);
}

#[derive(Debug, Error)]
enum StageError {
    #[error(transparent)]
    Resolve(#[from] CatalogError),
    #[error(transparent)]
    Transfer(#[from] FetchError),
    #[error(transparent)]
    Relocate(#[from] RelocateError),
    #[error("failed to record completion: {0}")]
    Record(#[from] StateError),
}

impl StageError {
    fn stage(&self) -> &'static str {
        match self {
            StageError::Resolve(_) => "resolve",
            StageError::Transfer(_) => "transfer",
            StageError::Relocate(_) => "relocate",
            StageError::Record(_) => "record",
        }
    }
}

pub struct DriverOptions {
    pub download_dir: PathBuf,
    /// Pause between items, a politeness floor toward the catalog host.
    pub item_delay: Duration,
    /// Checked between items only; an in-flight transfer is left to
    /// finish or fail on its own, the on-disk length makes a hard kill
    /// safe anyway.
    pub shutdown: Arc<AtomicBool>,
    pub ui: Arc<dyn TransferUi>,
}

pub struct Driver<R, C, S>
where
    R: Resolver,
    C: HttpClient,
    S: RemoteStore,
{
    resolver: R,
    fetcher: Fetcher<C>,
    relocator: Relocator<S>,
    ledger: Ledger,
    options: DriverOptions,
}

impl<R, C, S> Driver<R, C, S>
where
    R: Resolver,
    C: HttpClient,
    S: RemoteStore,
{
    pub fn new(
        resolver: R,
        fetcher: Fetcher<C>,
        relocator: Relocator<S>,
        ledger: Ledger,
        options: DriverOptions,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            relocator,
            ledger,
            options,
        }
    }

    /// Process every catalog item not already in the ledger, in catalog
    /// order. The pending set is fixed here, at the start of the run.
    pub async fn run(&mut self, catalog: &[Item]) -> RunSummary {
        let pending: Vec<&Item> = catalog
            .iter()
            .filter(|item| !self.ledger.contains(&item.id))
            .collect();
        let mut summary = RunSummary {
            skipped: catalog.len() - pending.len(),
            ..RunSummary::default()
        };
        info!(
            catalog = catalog.len(),
            pending = pending.len(),
            done = self.ledger.len(),
            "run starting"
        );

        let last = pending.len().saturating_sub(1);
        for (index, item) in pending.into_iter().enumerate() {
            if self.options.shutdown.load(Ordering::Relaxed) {
                warn!("interrupt requested, stopping before the next item");
                break;
            }

            summary.attempted += 1;
            match self.process(item).await {
                Ok(()) => summary.succeeded += 1,
                Err(StageError::Resolve(CatalogError::NotFound)) => {
                    summary.failed += 1;
                    warn!(item = %item.id, "no download link, skipping item");
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(
                        item = %item.id,
                        stage = err.stage(),
                        %err,
                        "item failed, staying pending"
                    );
                }
            }

            if index < last && !self.options.item_delay.is_zero() {
                tokio::time::sleep(self.options.item_delay).await;
            }
        }

        info!(%summary, "run finished");
        summary
    }

    async fn process(&mut self, item: &Item) -> Result<(), StageError> {
        info!(item = %item.id, title = %item.title, "processing");

        let resolved = self.resolver.resolve(item).await?;
        let file_name = artifact_file_name(item, resolved.suggested_name.as_deref());
        let dest = self.options.download_dir.join(&file_name);
        info!(item = %item.id, file = %file_name, size = %resolved.size_text, "resolved");

        let ui = self.options.ui.clone();
        let progress_name = file_name.clone();
        let fetch_options = FetchOptions::default().on_progress(Arc::new(
            move |progress: &Progress| ui.on_progress(&progress_name, progress),
        ));
        let outcome = self
            .fetcher
            .fetch(&resolved.final_url, &dest, fetch_options)
            .await;
        self.options.ui.on_done(&file_name);
        match outcome? {
            FetchOutcome::Completed { bytes_fetched, len } => {
                info!(item = %item.id, bytes = bytes_fetched, len, "transfer finished");
            }
            FetchOutcome::AlreadyComplete { len } => {
                info!(item = %item.id, len, "local file already complete");
            }
        }

        self.archive_info(item, &file_name, &resolved).await;

        let relocated = self.relocator.relocate(&dest).await?;
        if !relocated.local_removed {
            warn!(
                item = %item.id,
                path = %dest.display(),
                "local copy left behind after relocation"
            );
        }

        self.ledger.record(item.id.clone())?;
        info!(item = %item.id, bytes = relocated.bytes, "archived");
        Ok(())
    }

    /// Best effort: the metadata sidecar never fails the item.
    async fn archive_info(&self, item: &Item, artifact_name: &str, resolved: &ResolvedTransfer) {
        let info_path = match report::write_info_file(
            &self.options.download_dir,
            artifact_name,
            item,
            &resolved.size_text,
        ) {
            Ok(path) => path,
            Err(err) => {
                warn!(item = %item.id, %err, "could not write info sidecar");
                return;
            }
        };
        if let Err(err) = self.relocator.store().copy(&info_path).await {
            warn!(item = %item.id, %err, "could not copy info sidecar to remote store");
        }
        if let Err(err) = tokio::fs::remove_file(&info_path).await {
            warn!(item = %item.id, %err, "could not remove info sidecar");
        }
    }
}
