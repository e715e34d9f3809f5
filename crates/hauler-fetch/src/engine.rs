use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::client::HttpClient;
use crate::error::FetchError;
use crate::options::{FetchOptions, FetchPhase, Progress};

/// Outcome of a [`Fetcher::fetch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Bytes were streamed and the destination now matches the declared
    /// total (when one was declared).
    Completed { bytes_fetched: u64, len: u64 },
    /// The destination already held every byte the server reports; no body
    /// was read.
    AlreadyComplete { len: u64 },
}

/// How to carry out the transfer, decided from the local length and the
/// response status line alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferPlan {
    /// Write from byte zero, truncating whatever is on disk.
    Fresh { total: Option<u64> },
    /// The server honored the range: append to the existing bytes.
    Resume { total: Option<u64> },
    /// Nothing left to stream.
    AlreadyComplete,
}

impl TransferPlan {
    fn from_response(
        local_size: u64,
        status: u16,
        content_length: Option<u64>,
        total_size: Option<u64>,
    ) -> Result<Self, FetchError> {
        let plan = match status {
            200 => Self::Fresh {
                total: content_length,
            },
            206 => Self::Resume {
                // Prefer the Content-Range total; fall back to adding the
                // remainder the server is about to send.
                total: total_size.or_else(|| content_length.map(|len| local_size + len)),
            },
            401 | 403 => return Err(FetchError::AuthRequired(status)),
            // Range-not-satisfiable with an advertised total we already
            // cover means the file on disk is complete.
            416 if total_size.is_some_and(|total| local_size >= total) => Self::AlreadyComplete,
            other => return Err(FetchError::ServerRejected(other)),
        };

        match plan.total() {
            Some(total) if local_size >= total => Ok(Self::AlreadyComplete),
            _ => Ok(plan),
        }
    }

    fn total(&self) -> Option<u64> {
        match self {
            Self::Fresh { total } | Self::Resume { total } => *total,
            Self::AlreadyComplete => None,
        }
    }
}

/// Downloads artifacts with byte-offset resume.
pub struct Fetcher<C: HttpClient> {
    client: C,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Download `url` into `dest`, resuming from whatever is on disk.
    ///
    /// The destination's current length is the resume cursor: a nonzero
    /// length becomes a `Range` request from that offset. A server that
    /// ignores the range (200) restarts the file from scratch; one that
    /// honors it (206) gets the remainder appended. A failure at any point
    /// leaves the file in place for the next call.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        options: FetchOptions,
    ) -> Result<FetchOutcome, FetchError> {
        let local_size = match tokio::fs::metadata(dest).await {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => 0,
            Err(err) => return Err(err.into()),
        };

        report(
            &options,
            Progress {
                phase: FetchPhase::Connecting,
                bytes_received: local_size,
                total_bytes: None,
            },
        );

        let response = self
            .client
            .get(url, local_size, &options.headers)
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let plan = TransferPlan::from_response(
            local_size,
            response.status,
            response.content_length,
            response.total_size,
        )?;

        let (start, total) = match plan {
            TransferPlan::AlreadyComplete => {
                debug!(url, len = local_size, "destination already complete");
                return Ok(FetchOutcome::AlreadyComplete { len: local_size });
            }
            TransferPlan::Fresh { total } => (0, total),
            TransferPlan::Resume { total } => (local_size, total),
        };

        let mut file = if start > 0 {
            OpenOptions::new().append(true).open(dest).await?
        } else {
            tokio::fs::File::create(dest).await?
        };

        debug!(url, resume_from = start, ?total, "streaming transfer");

        let mut received = 0u64;
        let mut body = response.body;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FetchError::Network(e.to_string()))?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            report(
                &options,
                Progress {
                    phase: FetchPhase::Downloading,
                    bytes_received: start + received,
                    total_bytes: total,
                },
            );
        }
        file.flush().await?;
        drop(file);

        let len = tokio::fs::metadata(dest).await?.len();
        if let Some(total) = total {
            if len != total {
                return Err(FetchError::SizeMismatch {
                    expected: total,
                    actual: len,
                });
            }
        }

        report(
            &options,
            Progress {
                phase: FetchPhase::Completed,
                bytes_received: len,
                total_bytes: total,
            },
        );
        info!(url, bytes = received, len, "transfer complete");

        Ok(FetchOutcome::Completed {
            bytes_fetched: received,
            len,
        })
    }
}

fn report(options: &FetchOptions, progress: Progress) {
    if let Some(callback) = &options.on_progress {
        callback(&progress);
    }
}
