//! Driver for the Velleman K8055 (VM110) USB experimental interface board.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = k8055dd::BoardConfig::default();
//! let mut device = k8055dd::open_usb(&config)?;
//! device.initialize()?;
//! let inputs = device.read_all_inputs()?;
//! let pressed = k8055dd::decode_digital_inputs(u32::from(inputs.digital_raw))?;
//! device.prepare_digital_out(u32::from(pressed))?;
//! device.commit_outputs()?;
//! device.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design
//!
//! - [`Device`] owns its transport and buffers; nothing is process-global.
//! - [`Device::initialize`] replays the descriptor bootstrap and keeps a
//!   per-step [`BootstrapReport`].
//! - Every fallible call returns a [`K8055Error`] carrying the legacy
//!   bit-set codes, so callers can still compare against numeric values.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod bootstrap;
pub mod config;
pub mod device;

pub use bootstrap::{BootstrapOptions, BootstrapReport, StepOutcome, run_bootstrap};
pub use config::{BoardConfig, ConfigError, DemoConfig};
pub use device::{Device, DeviceState};

pub use k8055_protocol::{
    DigitalInput, DigitalInputState, ErrorKinds, INFO_ENTRIES, InputSnapshot, K8055Error,
    K8055Result, OutputState, check_digital_input, decode_digital_inputs, info_byte, info_string,
};
pub use k8055_transport::{
    DeviceSelector, Opener, RecordingSleeper, SimTransport, SimulatedBoard, Sleeper,
    ThreadSleeper, TransferKey, Transport,
};

#[cfg(feature = "libusb")]
pub use k8055_transport::{UsbOpener, UsbTransport};

/// Open the board named in `config` over libusb, with the configured
/// timeout and bootstrap options.
///
/// # Errors
///
/// `FROM_CALL` if the device cannot be found or claimed.
#[cfg(feature = "libusb")]
pub fn open_usb(config: &BoardConfig) -> K8055Result<Device<UsbTransport>> {
    let opener = UsbOpener::new(config.usb_timeout());
    Ok(Device::open(&opener, &config.device)?.with_options(config.bootstrap_options()))
}

/// Open a simulated board, for demos and tests without hardware.
///
/// # Errors
///
/// `FROM_CALL` if `config.device` does not select `board`.
pub fn open_simulated(
    board: &SimulatedBoard,
    config: &BoardConfig,
) -> K8055Result<Device<SimTransport>> {
    Ok(Device::open(board, &config.device)?.with_options(config.bootstrap_options()))
}
