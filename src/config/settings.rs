use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::Result;

const SETTINGS_FILE: &str = "settings.json";

fn default_check_interval() -> u64 {
    30
}

fn default_timeout() -> f64 {
    5.0
}

fn default_max_concurrent() -> usize {
    5
}

fn default_detect_proxy() -> bool {
    true
}

/// Persisted application settings with per-field defaults, so a partial
/// or older settings file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between scheduled checks.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Per-probe timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,

    /// Maximum concurrent platform probes.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Whether to auto-detect local VPN/proxy endpoints.
    #[serde(default = "default_detect_proxy")]
    pub detect_proxy: bool,

    /// Fixed proxy URL; set, it disables auto-detection.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Directory for rolling log files; console-only logging when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            timeout_secs: default_timeout(),
            max_concurrent: default_max_concurrent(),
            detect_proxy: default_detect_proxy(),
            proxy: None,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `data_dir`. A missing file yields defaults; a
    /// corrupt file logs a warning and yields defaults rather than
    /// refusing to start.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let file = data_dir.join(SETTINGS_FILE);
        if !file.exists() {
            debug!("no settings file at {}, using defaults", file.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&file)?;
        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!(
                    "settings file {} is corrupt ({err}), using defaults",
                    file.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(data_dir.join(SETTINGS_FILE), raw)?;
        Ok(())
    }

    pub fn file_path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE)
    }

    /// Platform data directory, with a local fallback for environments
    /// without one.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("netpulse"))
            .unwrap_or_else(|| PathBuf::from("data"))
    }
}
