//! Board configuration, loaded from YAML.
//!
//! ```yaml
//! device: "K8055_0"
//! usb_timeout_ms: 500
//! vendor_request_21h: false
//! demo:
//!   tables: 5
//!   lines_per_table: 6
//!   read_interval_ms: 1000
//!   write_step_delay_ms: 10
//! ```
//!
//! Every field is optional; missing fields take the defaults shown above
//! (device `"$"`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use k8055_transport::{DeviceSelector, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bootstrap::BootstrapOptions;

const MAX_TIMEOUT_MS: u64 = 60_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Device name, see [`DeviceSelector`].
    pub device: String,
    pub usb_timeout_ms: u64,
    pub vendor_request_21h: bool,
    pub demo: DemoConfig,
}

/// Timing of the console demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Number of input tables printed by the read demo.
    pub tables: u32,
    pub lines_per_table: u32,
    pub read_interval_ms: u64,
    pub write_step_delay_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            device: k8055_transport::name::DEFAULT_DEVICE_NAME.to_string(),
            usb_timeout_ms: 500,
            vendor_request_21h: false,
            demo: DemoConfig::default(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tables: 5,
            lines_per_table: 6,
            read_interval_ms: 1000,
            write_step_delay_ms: 10,
        }
    }
}

impl BoardConfig {
    /// Read, parse and validate a YAML file.
    ///
    /// # Errors
    ///
    /// I/O, parse and validation failures.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// # Errors
    ///
    /// Parse and validation failures.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Serialization failure.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.selector()?;
        if self.usb_timeout_ms == 0 || self.usb_timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "usb_timeout_ms must be in 1..={MAX_TIMEOUT_MS}, got {}",
                self.usb_timeout_ms
            )));
        }
        self.demo.validate()
    }

    /// Parsed device name.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the name cannot be parsed.
    pub fn selector(&self) -> Result<DeviceSelector, ConfigError> {
        self.device
            .parse()
            .map_err(|e: TransportError| ConfigError::Invalid(format!("device: {e}")))
    }

    pub fn usb_timeout(&self) -> Duration {
        Duration::from_millis(self.usb_timeout_ms)
    }

    pub fn bootstrap_options(&self) -> BootstrapOptions {
        BootstrapOptions {
            vendor_request_21h: self.vendor_request_21h,
        }
    }
}

impl DemoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tables == 0 || self.lines_per_table == 0 {
            return Err(ConfigError::Invalid(
                "demo.tables and demo.lines_per_table must be at least 1".to_string(),
            ));
        }
        if self.read_interval_ms > MAX_TIMEOUT_MS || self.write_step_delay_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "demo intervals must not exceed {MAX_TIMEOUT_MS} ms"
            )));
        }
        Ok(())
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    pub fn write_step_delay(&self) -> Duration {
        Duration::from_millis(self.write_step_delay_ms)
    }
}
