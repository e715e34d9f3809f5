//! Transfer progress rendering.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

use hauler_fetch::Progress;

use crate::pipeline::TransferUi;

const BAR_TEMPLATE: &str =
    "{spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const BAR_CHARS: &str = "█▓▒░  ";

static BAR_STYLE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .ok()
        .map(|style| style.tick_chars(TICK).progress_chars(BAR_CHARS))
});

/// One bar per transfer, created on the first progress event for a file
/// and torn down when its stage ends.
pub struct BarUi {
    active: Mutex<Option<(String, ProgressBar)>>,
}

impl BarUi {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }
}

impl TransferUi for BarUi {
    fn on_progress(&self, file_name: &str, progress: &Progress) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };

        let stale = !matches!(active.as_ref(), Some((name, _)) if name == file_name);
        if stale {
            if let Some((_, bar)) = active.take() {
                bar.finish_and_clear();
            }
            let bar = match progress.total_bytes {
                Some(total) => ProgressBar::new(total),
                None => ProgressBar::no_length(),
            };
            if let Some(style) = BAR_STYLE.as_ref() {
                bar.set_style(style.clone());
            }
            bar.set_message(file_name.chars().take(40).collect::<String>());
            *active = Some((file_name.to_string(), bar));
        }

        if let Some((_, bar)) = active.as_ref() {
            if let Some(total) = progress.total_bytes {
                bar.set_length(total);
            }
            bar.set_position(progress.bytes_received);
        }
    }

    fn on_done(&self, _file_name: &str) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        if let Some((_, bar)) = active.take() {
            bar.finish_and_clear();
        }
    }
}
