//! The fixed descriptor bootstrap sequence that brings a K8055 into data mode.
//!
//! Every step is one transfer of a fixed packet followed by a fixed delay. The
//! reply length of each step is compared with a constant; the constants for the
//! configuration descriptor (41) and the 30-byte vendor request (29) are the
//! values the board firmware is known to answer with, not the requested
//! lengths.
//!
//! ```text
//! #  step                         setup                      cap  check  delay
//! 1  device descriptor            80 06 00 01 00 00 12 00    18   18     19 ms
//! 2  configuration descriptor     80 06 00 02 00 00 30 00    48   41     19 ms
//! 3  language string descriptor   80 06 00 03 00 00 04 00     4    4     19 ms
//! 4  4th string descriptor        80 06 04 03 00 00 04 00     4    4     19 ms
//! 5  2nd string descriptor        80 06 02 03 09 04 14 00    20   20     19 ms
//! 6  set configuration 1          00 09 01 00 00 00 00 00     0    0     30 ms
//! 7  vendor request 21h (opt.)    21 0A 00 00 00 00 00 00     1    1     21 ms
//! 8  vendor request, 30 bytes     81 06 00 22 00 00 1E 00    30   29     19 ms
//! -  settle                                                              80 ms
//! 9  initial interrupt read       EC 10 00 00 81 03 08 00     8    8      1 s
//! ```

use core::time::Duration;

use crate::ids::{CONFIGURATION, EP_DATA_IN};
use crate::packet::Packet;
use crate::setup::{LANGID_EN_US, SetupPacket, descriptor, request};

/// Delay between step 8 and the initial interrupt read.
pub const SETTLE_DELAY: Duration = Duration::from_millis(80);

/// One step of the bootstrap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapStep {
    DeviceDescriptor,
    ConfigurationDescriptor,
    LanguageDescriptor,
    FourthStringDescriptor,
    SecondStringDescriptor,
    SetConfiguration,
    VendorRequest21h,
    VendorRequest30Bytes,
    InitialRead,
}

impl BootstrapStep {
    /// All steps in execution order.
    pub const ALL: [Self; 9] = [
        Self::DeviceDescriptor,
        Self::ConfigurationDescriptor,
        Self::LanguageDescriptor,
        Self::FourthStringDescriptor,
        Self::SecondStringDescriptor,
        Self::SetConfiguration,
        Self::VendorRequest21h,
        Self::VendorRequest30Bytes,
        Self::InitialRead,
    ];

    /// 1-based position in the sequence.
    pub const fn number(self) -> u8 {
        match self {
            Self::DeviceDescriptor => 1,
            Self::ConfigurationDescriptor => 2,
            Self::LanguageDescriptor => 3,
            Self::FourthStringDescriptor => 4,
            Self::SecondStringDescriptor => 5,
            Self::SetConfiguration => 6,
            Self::VendorRequest21h => 7,
            Self::VendorRequest30Bytes => 8,
            Self::InitialRead => 9,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::DeviceDescriptor => "device descriptor",
            Self::ConfigurationDescriptor => "configuration descriptor",
            Self::LanguageDescriptor => "language string descriptor",
            Self::FourthStringDescriptor => "4th string descriptor",
            Self::SecondStringDescriptor => "2nd string descriptor",
            Self::SetConfiguration => "set configuration",
            Self::VendorRequest21h => "vendor request 21h",
            Self::VendorRequest30Bytes => "vendor request 30 bytes",
            Self::InitialRead => "initial interrupt read",
        }
    }

    /// Header written before the transfer.
    pub const fn setup(self) -> SetupPacket {
        match self {
            Self::DeviceDescriptor => SetupPacket::get_descriptor(descriptor::DEVICE, 0, 0, 0x12),
            Self::ConfigurationDescriptor => {
                SetupPacket::get_descriptor(descriptor::CONFIGURATION, 0, 0, 0x30)
            }
            Self::LanguageDescriptor => SetupPacket::get_descriptor(descriptor::STRING, 0, 0, 4),
            Self::FourthStringDescriptor => {
                SetupPacket::get_descriptor(descriptor::STRING, 4, 0, 4)
            }
            Self::SecondStringDescriptor => {
                SetupPacket::get_descriptor(descriptor::STRING, 2, LANGID_EN_US, 0x14)
            }
            Self::SetConfiguration => SetupPacket::new(
                0x00,
                request::SET_CONFIGURATION,
                CONFIGURATION as u16,
                0,
                0,
            ),
            Self::VendorRequest21h => SetupPacket::new(0x21, request::SET_IDLE, 0, 0, 0),
            Self::VendorRequest30Bytes => SetupPacket::new(
                0x81,
                request::GET_DESCRIPTOR,
                (descriptor::HID_REPORT as u16) << 8,
                0,
                0x1E,
            ),
            Self::InitialRead => SetupPacket::new(
                crate::packet::INTERRUPT_MARKER,
                crate::packet::INTERRUPT_REQUEST,
                0,
                ((crate::packet::INTERRUPT_TRANSFER_TYPE as u16) << 8) | EP_DATA_IN as u16,
                8,
            ),
        }
    }

    /// Payload bytes reserved behind the header.
    pub const fn payload_capacity(self) -> usize {
        match self {
            Self::DeviceDescriptor => 18,
            Self::ConfigurationDescriptor => 48,
            Self::LanguageDescriptor | Self::FourthStringDescriptor => 4,
            Self::SecondStringDescriptor => 20,
            Self::SetConfiguration => 0,
            Self::VendorRequest21h => 1,
            Self::VendorRequest30Bytes => 30,
            Self::InitialRead => 8,
        }
    }

    /// Reply length the step is checked against.
    pub const fn expected_reply_len(self) -> u16 {
        match self {
            Self::DeviceDescriptor => 18,
            Self::ConfigurationDescriptor => 41,
            Self::LanguageDescriptor | Self::FourthStringDescriptor => 4,
            Self::SecondStringDescriptor => 20,
            Self::SetConfiguration => 0,
            Self::VendorRequest21h => 1,
            Self::VendorRequest30Bytes => 29,
            Self::InitialRead => 8,
        }
    }

    /// Fixed delay after the step's transfer.
    pub const fn delay_after(self) -> Duration {
        match self {
            Self::SetConfiguration => Duration::from_millis(30),
            Self::VendorRequest21h => Duration::from_millis(21),
            Self::InitialRead => Duration::from_secs(1),
            _ => Duration::from_millis(19),
        }
    }

    /// Step 7 is skipped unless explicitly requested.
    pub const fn enabled_by_default(self) -> bool {
        !matches!(self, Self::VendorRequest21h)
    }

    /// Fresh transfer buffer for this step.
    pub fn packet(self) -> Packet {
        Packet::control(self.setup(), self.payload_capacity())
    }
}

impl core::fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "step {} ({})", self.number(), self.name())
    }
}
