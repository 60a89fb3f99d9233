//! Configuration module for marklive.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `MARKLIVE_` and use double
//! underscores to separate nested levels:
//! - `MARKLIVE_WATCH__DEBOUNCE_MS=150` sets `watch.debounce_ms`
//! - `MARKLIVE_RELOAD__CONTENT_READY_TIMEOUT_MS=5000` sets `reload.content_ready_timeout_ms`
//! - `MARKLIVE_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::reload::{DEFAULT_CONTENT_READY_TIMEOUT_MS, Timing};
use crate::watcher::DEFAULT_DEBOUNCE_MS;

const ENV_PREFIX: &str = "MARKLIVE_";

/// Largest accepted value for either timing knob (one hour).
pub const MAX_DELAY_MS: u64 = 60 * 60 * 1000;

/// Settings that parsed but cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{key} = {value} is out of range (maximum {max})")]
    OutOfRange {
        key: &'static str,
        value: u64,
        max: u64,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    /// File watching
    #[serde(default)]
    pub watch: WatchConfig,

    /// Hot-reload handshake
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Quiet period before a burst of writes becomes one change event
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReloadConfig {
    /// How long to wait for the surface to report content ready
    #[serde(default = "default_content_ready_timeout_ms")]
    pub content_ready_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for everything not listed in `modules`
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `marklive = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

// Default value functions
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_content_ready_timeout_ms() -> u64 {
    DEFAULT_CONTENT_READY_TIMEOUT_MS
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            content_ready_timeout_ms: default_content_ready_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut modules = BTreeMap::new();
        modules.insert("marklive".to_string(), "info".to_string());
        Self {
            default: default_log_level(),
            modules,
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// `config_path` replaces the default location
    /// (`<config dir>/marklive/settings.toml`). A missing file is not an
    /// error; defaults and environment still apply.
    pub fn load(config_path: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);

        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            // Double underscore separates nesting levels; single
            // underscores stay inside field names.
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file, ignoring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(Box::new)
    }

    /// `<config dir>/marklive/settings.toml`, if the platform has one.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("marklive").join("settings.toml"))
    }

    /// Apply CLI overrides on top of the loaded layers.
    pub fn with_overrides(
        mut self,
        debounce_ms: Option<u64>,
        content_ready_timeout_ms: Option<u64>,
    ) -> Self {
        if let Some(ms) = debounce_ms {
            self.watch.debounce_ms = ms;
        }
        if let Some(ms) = content_ready_timeout_ms {
            self.reload.content_ready_timeout_ms = ms;
        }
        self
    }

    /// Check value ranges after all layers are applied.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let knobs = [
            ("watch.debounce_ms", self.watch.debounce_ms),
            (
                "reload.content_ready_timeout_ms",
                self.reload.content_ready_timeout_ms,
            ),
        ];
        for (key, value) in knobs {
            if value > MAX_DELAY_MS {
                return Err(SettingsError::OutOfRange {
                    key,
                    value,
                    max: MAX_DELAY_MS,
                });
            }
        }
        Ok(())
    }

    /// Timing knobs for the coordinator.
    pub fn timing(&self) -> Timing {
        Timing::from_millis(self.watch.debounce_ms, self.reload.content_ready_timeout_ms)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.watch.debounce_ms, 300);
        assert_eq!(settings.reload.content_ready_timeout_ms, 2000);
        assert_eq!(settings.logging.default, "warn");
        assert_eq!(
            settings.timing(),
            Timing {
                debounce_window: Duration::from_millis(300),
                content_ready_timeout: Duration::from_millis(2000),
            }
        );
    }

    #[test]
    fn test_validate_rejects_huge_delays() {
        assert_eq!(Settings::default().validate(), Ok(()));

        let settings = Settings::default().with_overrides(None, Some(100_000_000_000));
        assert_eq!(
            settings.validate(),
            Err(SettingsError::OutOfRange {
                key: "reload.content_ready_timeout_ms",
                value: 100_000_000_000,
                max: MAX_DELAY_MS,
            })
        );

        let settings = Settings::default().with_overrides(Some(MAX_DELAY_MS + 1), None);
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::OutOfRange {
                key: "watch.debounce_ms",
                ..
            })
        ));
        let settings = Settings::default().with_overrides(Some(MAX_DELAY_MS), None);
        assert_eq!(settings.validate(), Ok(()));
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[watch]
debounce_ms = 120

[reload]
content_ready_timeout_ms = 4500

[logging]
default = "debug"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.watch.debounce_ms, 120);
        assert_eq!(settings.reload.content_ready_timeout_ms, 4500);
        assert_eq!(settings.logging.default, "debug");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[watch]\ndebounce_ms = 50\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified value
        assert_eq!(settings.watch.debounce_ms, 50);
        // Defaults still present
        assert_eq!(settings.reload.content_ready_timeout_ms, 2000);
        assert_eq!(settings.logging.modules.get("marklive").map(String::as_str), Some("info"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 75;
        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 75);
    }

    #[test]
    fn test_cli_overrides_win() {
        let settings = Settings::default().with_overrides(Some(10), None);
        assert_eq!(settings.watch.debounce_ms, 10);
        assert_eq!(settings.reload.content_ready_timeout_ms, 2000);
    }
}
