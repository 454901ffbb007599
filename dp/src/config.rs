//! dailyplan configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::planner::PlannerConfig;
use crate::scheduler::SchedulerConfig;

/// Main dailyplan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plan shape limits
    pub planner: PlannerConfig,

    /// Background polling and dispatch
    pub scheduler: SchedulerConfig,

    /// Review timeouts
    pub approval: ApprovalConfig,

    /// File locations
    pub storage: StorageConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .dailyplan.yml
        let local_config = PathBuf::from(".dailyplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/dailyplan/dailyplan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dailyplan").join("dailyplan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed: the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".dailyplan.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("dailyplan").join("dailyplan.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_from_file(path).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Plan review configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Seconds to wait for an answer; 0 waits forever
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self { timeout_secs: 86_400 }
    }
}

impl ApprovalConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Issue snapshot read by the file source (JSON or YAML)
    #[serde(rename = "issues-file")]
    pub issues_file: PathBuf,

    /// Directory holding one closure record per day
    #[serde(rename = "closure-dir")]
    pub closure_dir: PathBuf,

    /// Optional JSONL file receiving every published event
    #[serde(rename = "event-log")]
    pub event_log: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/dailyplan on Linux)
        let closure_dir = dirs::data_dir()
            .map(|d| d.join("dailyplan").join("closure"))
            .unwrap_or_else(|| PathBuf::from(".dailyplan/closure"));

        Self {
            issues_file: PathBuf::from("issues.json"),
            closure_dir,
            event_log: None,
        }
    }
}
