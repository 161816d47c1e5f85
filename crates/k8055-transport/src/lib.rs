//! Transport adapters for the Velleman K8055.
//!
//! A [`Transport`] executes one transfer buffer at a time: it reads the 8-byte
//! header, performs the control or interrupt transfer it describes, and writes
//! the reply (payload, length field, toggle bit) back into the same buffer.
//! An [`Opener`] turns a device name into a transport.
//!
//! Backends:
//! - [`usb::UsbTransport`] talks to real hardware through libusb (feature `libusb`).
//! - [`sim::SimulatedBoard`] is a scripted board with fault injection for tests.
//!
//! Inter-step delays are expressed through the [`Sleeper`] trait so tests can
//! record them instead of waiting.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod clock;
pub mod name;
pub mod sim;
#[cfg(feature = "libusb")]
pub mod usb;

pub use clock::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use name::DeviceSelector;
pub use sim::{SimTransport, SimulatedBoard, TransferKey, TransferRecord};
#[cfg(feature = "libusb")]
pub use usb::{UsbOpener, UsbTransport};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Invalid device name: {0}")]
    InvalidName(String),

    #[error("Malformed transfer buffer: {0}")]
    MalformedPacket(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Transport closed")]
    Closed,

    #[cfg(feature = "libusb")]
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// One open connection to a board.
pub trait Transport {
    /// Execute the transfer described by the header of `packet`.
    ///
    /// On success the payload area holds the reply and header bytes 6..8 hold
    /// the number of bytes actually transferred. Interrupt IN transfers flip
    /// the toggle bit in header byte 1 when fresh data arrived.
    ///
    /// # Errors
    ///
    /// Any OS or device failure. No retries are attempted.
    fn transfer(&mut self, packet: &mut [u8]) -> TransportResult<()>;

    /// Release the device.
    ///
    /// # Errors
    ///
    /// Failure to release the interface.
    fn close(self) -> TransportResult<()>
    where
        Self: Sized;

    /// Name the transport was opened with.
    fn name(&self) -> &str;
}

/// Opens transports by device name.
pub trait Opener {
    type Transport: Transport;

    /// # Errors
    ///
    /// [`TransportError::InvalidName`] for names that cannot be parsed,
    /// [`TransportError::NotFound`] if no matching board is attached.
    fn open(&self, name: &str) -> TransportResult<Self::Transport>;
}

impl<O: Opener + ?Sized> Opener for &O {
    type Transport = O::Transport;

    fn open(&self, name: &str) -> TransportResult<Self::Transport> {
        (**self).open(name)
    }
}
