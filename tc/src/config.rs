//! Coordinator settings and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Coordinator settings
///
/// The worker topology lives in its own file; these settings only tune how
/// the coordinator runs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level for the log file (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Runtime directory shared with workers
    #[serde(rename = "runtime-dir")]
    pub runtime_dir: Option<PathBuf>,

    /// How long to wait for a worker to report ready or acknowledge a command
    #[serde(rename = "ack-timeout-ms")]
    pub ack_timeout_ms: u64,

    /// Polling interval while waiting for an acknowledgement
    #[serde(rename = "ack-poll-ms")]
    pub ack_poll_ms: u64,

    /// How long a worker gets to exit after SIGTERM before SIGKILL
    #[serde(rename = "shutdown-grace-ms")]
    pub shutdown_grace_ms: u64,

    /// Interactive history file
    #[serde(rename = "history-file")]
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            runtime_dir: None,
            ack_timeout_ms: 2000,
            ack_poll_ms: 5,
            shutdown_grace_ms: 500,
            history_file: None,
        }
    }
}

impl Config {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn ack_poll(&self) -> Duration {
        Duration::from_millis(self.ack_poll_ms.max(1))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Load settings with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load settings from {}", path.display()));
        }

        // Project-local settings: .tickmesh.yml
        let local_config = PathBuf::from(".tickmesh.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => skipped_settings(&local_config, &e),
            }
        }

        // User settings: ~/.config/tickmesh/tickmesh.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tickmesh").join("tickmesh.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => skipped_settings(&user_config, &e),
                }
            }
        }

        tracing::info!("No settings file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read settings file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse settings file")?;
        tracing::info!("Loaded settings from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Logging is not up yet while settings load, so the operator hears it on stderr
fn skipped_settings(path: &Path, err: &eyre::Report) {
    tracing::warn!("Failed to load settings from {}: {}", path.display(), err);
    eprintln!(
        "{} Failed to load settings from {}: {:#}",
        "warning:".yellow(),
        path.display(),
        err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ack_timeout(), Duration::from_secs(2));
        assert_eq!(config.ack_poll(), Duration::from_millis(5));
        assert_eq!(config.shutdown_grace(), Duration::from_millis(500));
        assert!(config.runtime_dir.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("ack-timeout-ms: 150\nruntime-dir: /run/tm\n").unwrap();
        assert_eq!(config.ack_timeout_ms, 150);
        assert_eq!(config.runtime_dir, Some(PathBuf::from("/run/tm")));
        assert_eq!(config.shutdown_grace_ms, 500);
    }

    #[test]
    fn test_zero_poll_is_clamped() {
        let config: Config = serde_yaml::from_str("ack-poll-ms: 0\n").unwrap();
        assert_eq!(config.ack_poll(), Duration::from_millis(1));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.yml");
        fs::write(&path, "log-level: debug\nshutdown-grace-ms: 50\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.shutdown_grace_ms, 50);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
