//! Error types for the k8055e console demo

use k8055dd::{ConfigError, K8055Error};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot open device '{name}': {source}")]
    DeviceOpen {
        name: String,
        #[source]
        source: K8055Error,
    },

    #[error("Initialisation of device '{name}' failed: {source}")]
    Bootstrap {
        name: String,
        #[source]
        source: K8055Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No USB backend compiled in; rebuild with the `libusb` feature or use --simulate")]
    NoBackend,
}
