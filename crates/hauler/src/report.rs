//! Per-item metadata sidecars and run totals.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use hauler_catalog::Item;

/// End-of-run totals. `skipped` counts items the ledger already covered
/// when the run started.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted {}, succeeded {}, failed {}, skipped {}",
            self.attempted, self.succeeded, self.failed, self.skipped
        )
    }
}

/// Write the metadata sidecar that travels with an artifact.
pub fn write_info_file(
    dir: &Path,
    artifact_name: &str,
    item: &Item,
    size_text: &str,
) -> std::io::Result<PathBuf> {
    let stem = artifact_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(artifact_name);
    let path = dir.join(format!("{stem}.info.txt"));

    let mut file = std::fs::File::create(&path)?;
    writeln!(file, "title: {}", item.title)?;
    writeln!(file, "developer: {}", item.developer)?;
    writeln!(file, "size: {size_text}")?;
    writeln!(file, "id: {}", item.id)?;
    writeln!(file, "archived_at: {}", chrono::Utc::now().to_rfc3339())?;
    writeln!(file, "source: {}", item.url)?;
    if !item.description.is_empty() {
        writeln!(file)?;
        writeln!(file, "{}", item.description)?;
    }
    Ok(path)
}
