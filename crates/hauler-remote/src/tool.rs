use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};
use which::which;

use crate::error::RelocateError;
use crate::store::RemoteStore;

/// Remote store backed by an rclone-style binary.
///
/// Two subcommands are assumed: `copyto <local> <remote>` with progress on
/// stderr, and `size --json <remote>` printing `{"bytes": N}` on stdout.
#[derive(Debug)]
pub struct ToolStore {
    tool: PathBuf,
    tool_name: String,
    remote_dir: String,
}

#[derive(Debug, Deserialize)]
struct SizeReport {
    bytes: u64,
}

impl ToolStore {
    /// Locate `tool` on PATH and bind it to `remote_dir`.
    ///
    /// Probing happens once, before any item is processed; an absent tool
    /// is a configuration error, not a per-item one.
    pub fn probe(tool: &str, remote_dir: impl Into<String>) -> Result<Self, RelocateError> {
        let path = which(tool).map_err(|_| RelocateError::ToolMissing(tool.to_string()))?;
        Ok(Self {
            tool: path,
            tool_name: tool.to_string(),
            remote_dir: remote_dir.into(),
        })
    }

    fn remote_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), file_name)
    }

    fn run_error(&self, source: std::io::Error) -> RelocateError {
        RelocateError::Tool {
            tool: self.tool_name.clone(),
            source,
        }
    }
}

impl RemoteStore for ToolStore {
    async fn copy(&self, local: &Path) -> Result<(), RelocateError> {
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote = self.remote_path(&file_name);
        info!(local = %local.display(), %remote, "copying to remote store");

        let mut child = Command::new(&self.tool)
            .arg("copyto")
            .arg(local)
            .arg(&remote)
            .arg("--progress")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.run_error(e))?;

        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await.map_err(|e| self.run_error(e))? {
                let line = line.trim();
                if !line.is_empty() {
                    debug!(target: "hauler_remote::tool", "{line}");
                }
            }
        }

        let status = child.wait().await.map_err(|e| self.run_error(e))?;
        if !status.success() {
            return Err(RelocateError::CopyFailed {
                code: status.code(),
            });
        }
        Ok(())
    }

    async fn size(&self, file_name: &str) -> Result<u64, RelocateError> {
        let remote = self.remote_path(file_name);
        let output = Command::new(&self.tool)
            .arg("size")
            .arg("--json")
            .arg(&remote)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.run_error(e))?;

        if !output.status.success() {
            return Err(RelocateError::SizeQuery(format!(
                "tool exited with status {:?}",
                output.status.code()
            )));
        }

        let report: SizeReport = serde_json::from_slice(&output.stdout)
            .map_err(|e| RelocateError::SizeQuery(e.to_string()))?;
        Ok(report.bytes)
    }
}
