//! # Configuration Management
//!
//! Centralized configuration for the BLE link service.
//!
//! This module provides structured configuration for the GATT service, the
//! serial relay radio, and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`

use crate::error::{BleError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Default serial device node for an attached relay radio.
pub const DEFAULT_RELAY_DEVICE: &str = "/dev/ttyBLE";

/// Baud rates probed when detecting a relay radio, most likely first.
pub const BAUD_CANDIDATES: [u32; 8] = [9600, 115_200, 1200, 2400, 4800, 19_200, 38_400, 57_600];

/// Longest advertising name that fits a BLE advertising payload.
pub const MAX_ADVERTISING_NAME_LEN: usize = 22;

/// Top-level configuration for the BLE link service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BleConfig {
    /// GATT service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Serial relay radio configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BleConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| BleError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| BleError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| BleError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("BLE_LINK_ADVERTISING_NAME") {
            config.service.advertising_name = name;
        }

        if let Ok(device) = std::env::var("BLE_LINK_RELAY_DEVICE") {
            config.relay.device = device;
        }

        if let Ok(bauds) = std::env::var("BLE_LINK_RELAY_BAUDS") {
            let parsed: Vec<u32> = bauds
                .split(',')
                .filter_map(|s| s.trim().parse::<u32>().ok())
                .collect();
            if !parsed.is_empty() {
                config.relay.baud_candidates = parsed;
            }
        }

        if let Ok(level) = std::env::var("BLE_LINK_LOG_LEVEL") {
            if let Ok(val) = level.parse::<Level>() {
                config.logging.log_level = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BleError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| BleError::Config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.service.validate());
        errors.extend(self.relay.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BleError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// GATT service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Name advertised to scanning centrals
    pub advertising_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            advertising_name: String::from("ble-link"),
        }
    }
}

impl ServiceConfig {
    /// Validate service configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.advertising_name.is_empty() {
            errors.push("Advertising name cannot be empty".to_string());
        } else if self.advertising_name.len() > MAX_ADVERTISING_NAME_LEN {
            errors.push(format!(
                "Advertising name too long: {} bytes (maximum: {MAX_ADVERTISING_NAME_LEN})",
                self.advertising_name.len()
            ));
        }

        if !self.advertising_name.is_ascii() {
            errors.push("Advertising name must be ASCII".to_string());
        }

        errors
    }
}

/// Serial relay radio configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Serial device node of the attached radio
    pub device: String,

    /// Baud rates to probe during detection, in order
    pub baud_candidates: Vec<u32>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            device: String::from(DEFAULT_RELAY_DEVICE),
            baud_candidates: BAUD_CANDIDATES.to_vec(),
        }
    }
}

impl RelayConfig {
    /// Validate relay configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.device.is_empty() {
            errors.push("Relay device path cannot be empty".to_string());
        }

        if self.baud_candidates.is_empty() {
            errors.push("At least one baud rate candidate is required".to_string());
        }

        for &baud in &self.baud_candidates {
            if !(1200..=921_600).contains(&baud) {
                errors.push(format!(
                    "Baud rate out of range: {baud} (valid range: 1200-921600)"
                ));
            }
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BleConfig::default().validate().is_empty());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = BleConfig::default_with_overrides(|c| {
            c.service.advertising_name = String::from("workbench");
            c.relay.baud_candidates = vec![115_200];
            c.logging.log_level = Level::DEBUG;
        });
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed = BleConfig::from_toml(&rendered).unwrap();
        assert_eq!(parsed.service.advertising_name, "workbench");
        assert_eq!(parsed.relay.baud_candidates, vec![115_200]);
        assert_eq!(parsed.logging.log_level, Level::DEBUG);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = BleConfig::from_toml("[service]\nadvertising_name = \"bench\"\n").unwrap();
        assert_eq!(parsed.service.advertising_name, "bench");
        assert_eq!(parsed.relay.device, DEFAULT_RELAY_DEVICE);
        assert_eq!(parsed.relay.baud_candidates, BAUD_CANDIDATES.to_vec());
    }

    #[test]
    fn test_invalid_advertising_name_rejected() {
        let config = BleConfig::default_with_overrides(|c| {
            c.service.advertising_name = String::new();
        });
        assert!(!config.validate().is_empty());
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn test_baud_rate_bounds_checked() {
        let config = BleConfig::default_with_overrides(|c| {
            c.relay.baud_candidates = vec![300];
        });
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(
            BleConfig::from_toml("relay = \"not a table\""),
            Err(BleError::Config(_))
        ));
    }
}
