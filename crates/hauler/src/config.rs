//! Run configuration.
//!
//! Everything the pipeline needs is resolved up front into one immutable
//! [`Config`]: file values first, flags on top. Nothing downstream reads
//! flags, files, or process environment again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use hauler_remote::VerifyFailurePolicy;

pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const LEDGER_FILE: &str = "hauler-ledger.json";
pub const CACHE_FILE: &str = "hauler-catalog.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub listing_path: String,
    pub start_page: u32,
    pub end_page: u32,
    pub download_dir: PathBuf,
    pub tool: String,
    pub remote_dir: String,
    pub item_delay: Duration,
    pub verify_failure: VerifyFailurePolicy,
    pub user_agent: String,
}

/// On-disk configuration. Everything is optional here; required values
/// missing from both the file and the flags fail resolution.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub listing_path: Option<String>,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub download_dir: Option<PathBuf>,
    pub tool: Option<String>,
    pub remote_dir: Option<String>,
    pub item_delay_secs: Option<u64>,
    pub keep_on_verify_failure: Option<bool>,
    pub user_agent: Option<String>,
}

/// Flag-level overrides shared by every subcommand.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    /// Catalog site root, e.g. https://example.org
    #[arg(long)]
    pub base_url: Option<String>,

    /// Listing path under the site root.
    #[arg(long)]
    pub listing_path: Option<String>,

    /// Directory for in-flight artifacts and run state.
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Remote-store binary to invoke.
    #[arg(long)]
    pub tool: Option<String>,

    /// Remote destination directory, e.g. remote:archive
    #[arg(long)]
    pub remote_dir: Option<String>,

    /// Seconds to pause between items.
    #[arg(long)]
    pub item_delay_secs: Option<u64>,

    /// Keep the local file when remote verification fails instead of
    /// deleting it.
    #[arg(long)]
    pub keep_on_verify_failure: bool,

    /// User-Agent header for catalog and transfer requests.
    #[arg(long)]
    pub user_agent: Option<String>,
}

pub fn load_file(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

impl Config {
    pub fn resolve(file: FileConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let base_url = overrides
            .base_url
            .clone()
            .or(file.base_url)
            .context("a catalog base URL is required (--base-url or config file)")?;
        let remote_dir = overrides
            .remote_dir
            .clone()
            .or(file.remote_dir)
            .context("a remote destination is required (--remote-dir or config file)")?;

        let keep_local =
            overrides.keep_on_verify_failure || file.keep_on_verify_failure.unwrap_or(false);

        Ok(Self {
            base_url,
            remote_dir,
            listing_path: overrides
                .listing_path
                .clone()
                .or(file.listing_path)
                .unwrap_or_else(|| "/catalog/".to_string()),
            start_page: file.start_page.unwrap_or(1),
            end_page: file.end_page.unwrap_or(1),
            download_dir: overrides
                .download_dir
                .clone()
                .or(file.download_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            tool: overrides
                .tool
                .clone()
                .or(file.tool)
                .unwrap_or_else(|| "rclone".to_string()),
            item_delay: Duration::from_secs(
                overrides.item_delay_secs.or(file.item_delay_secs).unwrap_or(2),
            ),
            verify_failure: if keep_local {
                VerifyFailurePolicy::KeepLocal
            } else {
                VerifyFailurePolicy::DeleteLocal
            },
            user_agent: overrides
                .user_agent
                .clone()
                .or(file.user_agent)
                .unwrap_or_else(|| concat!("hauler/", env!("CARGO_PKG_VERSION")).to_string()),
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.download_dir.join(LEDGER_FILE)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.download_dir.join(CACHE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_file() -> FileConfig {
        FileConfig {
            base_url: Some("https://file.test".into()),
            remote_dir: Some("remote:file".into()),
            ..FileConfig::default()
        }
    }

    #[test]
    fn flags_override_file_values() {
        let overrides = ConfigOverrides {
            base_url: Some("https://flag.test".into()),
            item_delay_secs: Some(0),
            ..ConfigOverrides::default()
        };
        let config = Config::resolve(minimal_file(), &overrides).unwrap();
        assert_eq!(config.base_url, "https://flag.test");
        assert_eq!(config.remote_dir, "remote:file");
        assert_eq!(config.item_delay, Duration::ZERO);
    }

    #[test]
    fn defaults_fill_the_rest() {
        let config = Config::resolve(minimal_file(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.tool, "rclone");
        assert_eq!(config.download_dir, PathBuf::from(DEFAULT_DOWNLOAD_DIR));
        assert_eq!(config.item_delay, Duration::from_secs(2));
        assert_eq!(config.verify_failure, VerifyFailurePolicy::DeleteLocal);
        assert_eq!((config.start_page, config.end_page), (1, 1));
    }

    #[test]
    fn missing_base_url_is_an_error() {
        let file = FileConfig {
            remote_dir: Some("remote:file".into()),
            ..FileConfig::default()
        };
        assert!(Config::resolve(file, &ConfigOverrides::default()).is_err());
    }

    #[test]
    fn verify_failure_policy_is_configurable() {
        let overrides = ConfigOverrides {
            keep_on_verify_failure: true,
            ..ConfigOverrides::default()
        };
        let config = Config::resolve(minimal_file(), &overrides).unwrap();
        assert_eq!(config.verify_failure, VerifyFailurePolicy::KeepLocal);

        let file = FileConfig {
            keep_on_verify_failure: Some(true),
            ..minimal_file()
        };
        let config = Config::resolve(file, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.verify_failure, VerifyFailurePolicy::KeepLocal);
    }

    #[test]
    fn file_parsing_rejects_unknown_keys() {
        let parsed: Result<FileConfig, _> = toml::from_str("unknown_key = 1");
        assert!(parsed.is_err());

        let parsed: FileConfig =
            toml::from_str("base_url = \"https://x.test\"\nitem_delay_secs = 5").unwrap();
        assert_eq!(parsed.item_delay_secs, Some(5));
    }

    #[test]
    fn state_paths_live_in_the_download_dir() {
        let config = Config::resolve(minimal_file(), &ConfigOverrides::default()).unwrap();
        assert!(config.ledger_path().starts_with(&config.download_dir));
        assert!(config.cache_path().starts_with(&config.download_dir));
    }
}
