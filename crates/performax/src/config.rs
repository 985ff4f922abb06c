//! Configuration management

use crate::startup::{InitStep, default_init_sequence};
use anyhow::{Context, Result, anyhow};
use protocol::Timeouts;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformaxConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Exchange timeouts applied on connect
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    /// Flush retry and initialization sequence
    #[serde(default)]
    pub startup: StartupSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_level(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "TimeoutSettings::default_ms")]
    pub read_ms: u64,
    #[serde(default = "TimeoutSettings::default_ms")]
    pub write_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            read_ms: Self::default_ms(),
            write_ms: Self::default_ms(),
        }
    }
}

impl TimeoutSettings {
    fn default_ms() -> u64 {
        500
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from_millis(self.read_ms, self.write_ms)
    }
}

/// Controller bring-up configuration
///
/// # Example Configuration
/// ```toml
/// [startup]
/// flush_attempts = 5
/// flush_retry_interval_ms = 1000
///
/// [[startup.init_sequence]]
/// command = "EO=1"
/// delay_ms = 100
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupSettings {
    /// Flush attempts after connecting before giving up
    #[serde(default = "StartupSettings::default_flush_attempts")]
    pub flush_attempts: u32,
    /// Pause between flush attempts
    #[serde(default = "StartupSettings::default_flush_interval")]
    pub flush_retry_interval_ms: u64,
    /// Commands sent by `init`, in order
    #[serde(default = "default_init_sequence")]
    pub init_sequence: Vec<InitStep>,
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            flush_attempts: Self::default_flush_attempts(),
            flush_retry_interval_ms: Self::default_flush_interval(),
            init_sequence: default_init_sequence(),
        }
    }
}

impl StartupSettings {
    fn default_flush_attempts() -> u32 {
        10
    }

    fn default_flush_interval() -> u64 {
        1000
    }
}

impl PerformaxConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/performax/performax.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration from a user-supplied path, expanding `~`
    pub fn load_from(path: &str) -> Result<Self> {
        Self::load(Some(Self::expand_path(path)))
    }

    /// Expand `~` in a user-supplied path
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).as_ref())
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PerformaxConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("performax").join("performax.toml")
        } else {
            PathBuf::from(".config/performax/performax.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.log_level,
                valid_levels.join(", ")
            ));
        }

        // libusb reads a zero timeout as "no timeout"
        if self.timeouts.read_ms == 0 || self.timeouts.write_ms == 0 {
            return Err(anyhow!("Timeouts must be greater than 0 ms"));
        }

        if self.startup.flush_attempts == 0 {
            return Err(anyhow!("flush_attempts must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PerformaxConfig::default();
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.timeouts.timeouts(), Timeouts::default());
        assert_eq!(config.startup.flush_attempts, 10);
        assert_eq!(config.startup.init_sequence.len(), 22);
    }

    #[test]
    fn test_config_serialization() {
        let config = PerformaxConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = PerformaxConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.logging.log_level, parsed.logging.log_level);
        assert_eq!(config.startup.init_sequence, parsed.startup.init_sequence);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = PerformaxConfig::default();
        assert!(config.validate().is_ok());

        config.logging.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = PerformaxConfig::default();
        config.timeouts.read_ms = 0;
        assert!(config.validate().is_err());
    }
}
