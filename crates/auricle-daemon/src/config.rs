//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use auricle_core::RoutePolicy;
use auricle_host::WatcherConfig;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Route reconciliation settings
    #[serde(default)]
    pub route: RouteConfig,
    /// Host backend settings
    #[serde(default)]
    pub host: HostConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Route reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Debounce window in milliseconds; 0 disables debouncing
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Whether wired headsets outrank connected Bluetooth profiles
    #[serde(default = "default_true")]
    pub wired_overrides_bluetooth: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), wired_overrides_bluetooth: true }
    }
}

impl RouteConfig {
    /// Build the watcher configuration for these settings.
    #[must_use]
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            policy: RoutePolicy { wired_overrides_bluetooth: self.wired_overrides_bluetooth },
            debounce_window: Duration::from_millis(self.debounce_ms),
        }
    }
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

/// Host backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Which platform backend to run against
    #[serde(default)]
    pub backend: HostBackend,
}

/// Available host backends. Platform integrations register here as they
/// land; `null` reports no devices and never signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HostBackend {
    #[default]
    Null,
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_path()?;

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
        Ok(config)
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "auricle", "Auricle")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.route.debounce_ms, 100);
        assert!(config.route.wired_overrides_bluetooth);
        assert_eq!(config.host.backend, HostBackend::Null);
    }

    #[test]
    fn route_settings_parse() {
        let config: Config = toml::from_str(
            r#"
            [route]
            debounce_ms = 0
            wired_overrides_bluetooth = false
            "#,
        )
        .unwrap();

        let watcher = config.route.watcher_config();
        assert!(watcher.debounce_window.is_zero());
        assert!(!watcher.policy.wired_overrides_bluetooth);
    }

    #[test]
    fn backend_parses_from_lowercase() {
        let config: Config = toml::from_str("[host]\nbackend = \"null\"\n").unwrap();
        assert_eq!(config.host.backend, HostBackend::Null);
    }
}
