//! Configuration management for polling intervals, bridge and UI preferences.
//!
//! Stores configuration in JSON format at `~/.kubedesk/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::View;
use crate::error::{Error, Result};

/// Configuration data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Port-forward reconciliation interval in milliseconds.
    #[serde(default = "default_port_forward_poll_interval")]
    pub port_forward_poll_interval_ms: u64,

    /// External context-change detection interval in milliseconds.
    #[serde(default = "default_context_poll_interval")]
    pub context_poll_interval_ms: u64,

    /// Minimum display time of each startup check in milliseconds.
    #[serde(default = "default_startup_step_delay")]
    pub startup_step_delay_ms: u64,

    /// Pause after the last startup check before the app is initialized.
    #[serde(default = "default_startup_settle_delay")]
    pub startup_settle_delay_ms: u64,

    /// How long the stdio bridge waits for a response.
    #[serde(default = "default_bridge_timeout")]
    pub bridge_timeout_secs: u64,

    /// Drop fetch completions older than the one already applied.
    #[serde(default)]
    pub discard_stale_completions: bool,

    /// Queue notifications for port-forward status changes.
    #[serde(default = "default_true")]
    pub port_forward_notifications: bool,

    #[serde(default)]
    pub sidebar_collapsed: bool,

    #[serde(default)]
    pub last_view: View,

    /// Program and arguments of the native backend helper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_command: Option<Vec<String>>,
}

fn default_port_forward_poll_interval() -> u64 {
    2000
}

fn default_context_poll_interval() -> u64 {
    3000
}

fn default_startup_step_delay() -> u64 {
    400
}

fn default_startup_settle_delay() -> u64 {
    300
}

fn default_bridge_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_forward_poll_interval_ms: default_port_forward_poll_interval(),
            context_poll_interval_ms: default_context_poll_interval(),
            startup_step_delay_ms: default_startup_step_delay(),
            startup_settle_delay_ms: default_startup_settle_delay(),
            bridge_timeout_secs: default_bridge_timeout(),
            discard_stale_completions: false,
            port_forward_notifications: true,
            sidebar_collapsed: false,
            last_view: View::default(),
            backend_command: None,
        }
    }
}

impl Config {
    /// Rejects settings that would make polling or the bridge spin.
    pub fn validate(&self) -> Result<()> {
        if self.port_forward_poll_interval_ms == 0 {
            return Err(Error::Config(
                "portForwardPollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.context_poll_interval_ms == 0 {
            return Err(Error::Config(
                "contextPollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.bridge_timeout_secs == 0 {
            return Err(Error::Config(
                "bridgeTimeoutSecs must be greater than zero".to_string(),
            ));
        }
        if let Some(command) = &self.backend_command {
            if command.is_empty() {
                return Err(Error::Config("backendCommand must not be empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn port_forward_poll_interval(&self) -> Duration {
        Duration::from_millis(self.port_forward_poll_interval_ms)
    }

    pub fn context_poll_interval(&self) -> Duration {
        Duration::from_millis(self.context_poll_interval_ms)
    }

    pub fn startup_step_delay(&self) -> Duration {
        Duration::from_millis(self.startup_step_delay_ms)
    }

    pub fn startup_settle_delay(&self) -> Duration {
        Duration::from_millis(self.startup_settle_delay_ms)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }

    /// Zero delays everywhere; used by tests and scripted runs.
    pub fn without_delays() -> Self {
        Self {
            startup_step_delay_ms: 0,
            startup_settle_delay_ms: 0,
            ..Self::default()
        }
    }
}

/// Configuration store for managing app settings.
///
/// Handles reading and writing configuration to `~/.kubedesk/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.kubedesk/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        let config_path = home.join(".kubedesk").join("config.json");

        Ok(Self { config_path })
    }

    /// Create a config store with a custom path (for testing).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;

        if let Some(config_dir) = self.config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).await.map_err(|e| {
                    Error::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }

    /// Load, apply `change`, and save.
    pub async fn update<F>(&self, change: F) -> Result<Config>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load().await?;
        change(&mut config);
        self.save(&config).await?;
        Ok(config)
    }

    /// Set the port-forward polling interval in milliseconds.
    pub async fn set_port_forward_poll_interval(&self, interval_ms: u64) -> Result<()> {
        self.update(|c| c.port_forward_poll_interval_ms = interval_ms)
            .await
            .map(|_| ())
    }

    /// Remember the last visible view.
    pub async fn set_last_view(&self, view: View) -> Result<()> {
        self.update(|c| c.last_view = view).await.map(|_| ())
    }

    /// Set the backend helper command line.
    pub async fn set_backend_command(&self, command: Option<Vec<String>>) -> Result<()> {
        self.update(|c| c.backend_command = command).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_store() -> (ConfigStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        (ConfigStore::with_path(path), dir)
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _dir) = test_store().await;
        let config = store.load().await.unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port_forward_poll_interval(), Duration::from_secs(2));
        assert_eq!(config.context_poll_interval(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _dir) = test_store().await;

        let config = Config {
            port_forward_poll_interval_ms: 500,
            discard_stale_completions: true,
            last_view: View::Pods,
            backend_command: Some(vec!["kubedesk-backend".into(), "--stdio".into()]),
            ..Config::default()
        };

        store.save(&config).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let (store, _dir) = test_store().await;
        tokio::fs::write(store.path(), r#"{"contextPollIntervalMs": 10000}"#)
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.context_poll_interval_ms, 10_000);
        assert_eq!(loaded.port_forward_poll_interval_ms, 2000);
        assert!(loaded.port_forward_notifications);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let (store, _dir) = test_store().await;
        let result = store.set_port_forward_poll_interval(0).await;
        assert!(matches!(result, Err(Error::Config(_))));

        // nothing was written
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_update_settings() {
        let (store, _dir) = test_store().await;

        store.set_port_forward_poll_interval(750).await.unwrap();
        store.set_last_view(View::Services).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.port_forward_poll_interval_ms, 750);
        assert_eq!(loaded.last_view, View::Services);
    }
}
