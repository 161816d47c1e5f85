//! Wire protocol for the Velleman K8055 (VM110) USB experimental interface board.
//!
//! The board enumerates as VID `0x10CF`, PID `0x5500 + address` (two jumpers
//! select one of four card addresses). Host software talks to it in two phases:
//!
//! 1. A fixed bootstrap handshake on EP0: descriptor requests, set-configuration
//!    and two vendor requests ([`bootstrap`]).
//! 2. Data exchange over the interrupt endpoints EP81 (inputs) and EP01 (outputs)
//!    with 8-byte reports ([`report`]). A toggle bit in the transfer header tells
//!    fresh input data from a stale buffer.
//!
//! Every transfer is a single byte buffer: an 8-byte header ([`setup`]) followed
//! by the payload. The transport executes the header and writes the observed
//! reply length back into it ([`packet`]).
//!
//! ## Design
//! This crate is I/O-free. It provides constants, buffer types and pure
//! functions that can be tested without hardware access.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod bootstrap;
pub mod digital;
pub mod error;
pub mod ids;
pub mod info;
pub mod packet;
pub mod report;
pub mod setup;

pub use bootstrap::{BootstrapStep, SETTLE_DELAY};
pub use digital::{
    DigitalInput, DigitalInputState, RAW_INPUT_MASK, check_digital_input, decode_digital_inputs,
};
pub use error::{ErrorKinds, K8055Error, K8055Result};
pub use ids::{
    EP_DATA_IN, EP_DATA_OUT, INTERFACE, MAX_CARDS, PID_BASE, VENDOR_ID, card_address, is_k8055,
    product_id_for_card,
};
pub use info::{INFO_ENTRIES, INFO_ENTRY_LEN, info_byte, info_string};
pub use packet::{Packet, TransferKind};
pub use report::{
    DATA_BUFFER_LEN, DATA_PAYLOAD_LEN, GetDataBuffer, InputSnapshot, OutputState, PutDataBuffer,
};
pub use setup::{SETUP_HEADER_LEN, SetupPacket};
