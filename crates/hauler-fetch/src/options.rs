use std::fmt;
use std::sync::Arc;

/// Phases of a transfer, in order. There is no retry loop here, so the
/// sequence only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Connecting,
    Downloading,
    Completed,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPhase::Connecting => write!(f, "connecting"),
            FetchPhase::Downloading => write!(f, "downloading"),
            FetchPhase::Completed => write!(f, "completed"),
        }
    }
}

/// Snapshot passed to progress callbacks.
///
/// `bytes_received` counts from the start of the file, not the start of
/// this call, so a resumed transfer reports cumulative position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub phase: FetchPhase,
    pub bytes_received: u64,
    pub total_bytes: Option<u64>,
}

impl Progress {
    /// Percentage of completion, when the total is known.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.bytes_received as f64 / total as f64) * 100.0
            }
        })
    }
}

/// Configuration for a single transfer.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Custom headers sent with the request (the range header is managed
    /// by the engine and must not appear here).
    pub headers: Vec<(String, String)>,

    /// Invoked on phase transitions and after each chunk write.
    pub on_progress: Option<Arc<dyn Fn(&Progress) + Send + Sync>>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("headers", &self.headers)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl FetchOptions {
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}
