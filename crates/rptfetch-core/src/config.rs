use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per file (including the first).
    pub max_attempts: u32,
    /// Fixed delay in seconds between attempts.
    pub delay_secs: f64,
    /// Extra random delay added to each wait, in milliseconds (0 = none).
    #[serde(default)]
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 2.0,
            jitter_ms: 0,
        }
    }
}

/// Upper bound for the configured retry delay.
pub const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

impl RetryConfig {
    /// Delay between attempts, clamped to `0..=MAX_RETRY_DELAY_SECS` (NaN counts as 0).
    pub fn delay(&self) -> Duration {
        let secs = if self.delay_secs.is_nan() {
            0.0
        } else {
            self.delay_secs.clamp(0.0, MAX_RETRY_DELAY_SECS)
        };
        Duration::from_secs_f64(secs)
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            delay: self.delay(),
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

pub const DEFAULT_LISTING_URL: &str =
    "http://www.taifex.com.tw/cht/3/dlFutPrevious30DaysSalesData";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/95.0.4638.54 Safari/537.36";

/// Global configuration loaded from `~/.config/rptfetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Listing page enumerating the currently published archives.
    pub listing_url: String,
    /// Directory the archives (and the retention marker) are written to.
    pub download_dir: PathBuf,
    /// Number of concurrent download workers.
    pub workers: usize,
    /// Timeout in seconds for connecting and for any stall mid-transfer.
    /// A transfer that keeps making progress is not cut off.
    pub timeout_secs: u64,
    /// Newest N days of publications withheld from download.
    pub withheld_days: u32,
    /// Only links ending with this suffix are archives.
    pub archive_extension: String,
    /// Links containing any of these path fragments are alternate deliveries and skipped.
    #[serde(default)]
    pub excluded_path_segments: Vec<String>,
    /// Transfer chunk size in bytes.
    pub chunk_size: usize,
    /// Headers sent with every request (listing page and archives).
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
    headers
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            download_dir: PathBuf::from("rpt"),
            workers: 5,
            timeout_secs: 30,
            withheld_days: 2,
            archive_extension: ".zip".to_string(),
            excluded_path_segments: vec!["/DailydownloadCSV/".to_string()],
            chunk_size: 8192,
            headers: default_headers(),
            retry: RetryConfig::default(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Worker count actually used for a run (never zero).
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rptfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<FetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: FetchConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
