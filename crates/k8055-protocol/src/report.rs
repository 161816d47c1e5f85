//! The 16-byte get/put data buffers exchanged over the interrupt endpoints.
//!
//! Get buffer (EP81), payload offsets relative to the whole buffer:
//!
//! | Offset | Field |
//! |--------|-------|
//! | 8      | digital inputs, raw bit layout |
//! | 9      | unused |
//! | 10     | analog input A1 |
//! | 11     | analog input A2 |
//! | 12..14 | counter 1, little-endian |
//! | 14..16 | counter 2, little-endian |
//!
//! Put buffer (EP01): `0x05` marker at 8, digital outputs at 9, DAC1 at 10,
//! DAC2 at 11, remaining bytes zero.

use crate::error::{ErrorKinds, K8055Error, K8055Result};
use crate::ids::{EP_DATA_IN, EP_DATA_OUT};
use crate::packet::{self, interrupt_header};
use crate::setup::SETUP_HEADER_LEN;

/// Total length of a data buffer (header + payload).
pub const DATA_BUFFER_LEN: usize = 16;

/// Payload length of a data buffer.
pub const DATA_PAYLOAD_LEN: usize = 8;

/// Command byte that precedes the output values.
pub const OUTPUT_MARKER: u8 = 0x05;

const OFFSET_DIGITAL_IN: usize = 8;
const OFFSET_ANALOG_1: usize = 10;
const OFFSET_ANALOG_2: usize = 11;
const OFFSET_COUNTER_1: usize = 12;
const OFFSET_COUNTER_2: usize = 14;

const OFFSET_MARKER: usize = 8;
const OFFSET_DIGITAL_OUT: usize = 9;

fn data_buffer(endpoint: u8) -> [u8; DATA_BUFFER_LEN] {
    let mut buf = [0u8; DATA_BUFFER_LEN];
    buf[..SETUP_HEADER_LEN].copy_from_slice(&interrupt_header(endpoint, DATA_PAYLOAD_LEN as u16));
    buf
}

/// Decoded input values of one fresh read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InputSnapshot {
    /// Digital inputs in the board's raw bit layout, see
    /// [`decode_digital_inputs`](crate::digital::decode_digital_inputs).
    pub digital_raw: u8,
    pub analog1: u8,
    pub analog2: u8,
}

/// Values written by one output commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OutputState {
    /// Digital outputs, bit 0 = O1 .. bit 7 = O8.
    pub digital: u8,
    pub dac1: u8,
    pub dac2: u8,
}

/// Buffer read from EP81.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetDataBuffer([u8; DATA_BUFFER_LEN]);

impl Default for GetDataBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GetDataBuffer {
    pub fn new() -> Self {
        Self(data_buffer(EP_DATA_IN))
    }

    pub fn as_bytes(&self) -> &[u8; DATA_BUFFER_LEN] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8; DATA_BUFFER_LEN] {
        &mut self.0
    }

    pub fn toggle_bit(&self) -> bool {
        packet::toggle_bit(&self.0)
    }

    /// Length written back by the last transfer.
    pub fn reply_len(&self) -> u16 {
        packet::reply_len(&self.0).unwrap_or(0)
    }

    /// Request `len` bytes with the next transfer.
    pub fn rearm(&mut self, len: u16) {
        packet::set_reply_len(&mut self.0, len);
    }

    pub fn payload(&self) -> &[u8] {
        &self.0[SETUP_HEADER_LEN..]
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            digital_raw: self.0[OFFSET_DIGITAL_IN],
            analog1: self.0[OFFSET_ANALOG_1],
            analog2: self.0[OFFSET_ANALOG_2],
        }
    }

    /// Counter 1 or 2 as `lo + 256 * hi`.
    ///
    /// # Errors
    ///
    /// `RANGE` for any other index.
    pub fn counter(&self, index: u8) -> K8055Result<u16> {
        let offset = match index {
            1 => OFFSET_COUNTER_1,
            2 => OFFSET_COUNTER_2,
            _ => return Err(K8055Error::range()),
        };
        match self.0.get(offset..offset + 2) {
            Some(&[lo, hi]) => Ok(u16::from_le_bytes([lo, hi])),
            _ => Err(K8055Error::new(ErrorKinds::INTERN)),
        }
    }
}

/// Buffer written to EP01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutDataBuffer([u8; DATA_BUFFER_LEN]);

impl Default for PutDataBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PutDataBuffer {
    pub fn new() -> Self {
        let mut buf = data_buffer(EP_DATA_OUT);
        buf[OFFSET_MARKER] = OUTPUT_MARKER;
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8; DATA_BUFFER_LEN] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8; DATA_BUFFER_LEN] {
        &mut self.0
    }

    pub fn reply_len(&self) -> u16 {
        packet::reply_len(&self.0).unwrap_or(0)
    }

    pub fn rearm(&mut self, len: u16) {
        packet::set_reply_len(&mut self.0, len);
    }

    /// Stage the digital outputs. The buffer is untouched on error.
    ///
    /// # Errors
    ///
    /// `RANGE` if `value` does not fit in a byte.
    pub fn set_digital(&mut self, value: u32) -> K8055Result<()> {
        let byte = u8::try_from(value).ok().ok_or_else(K8055Error::range)?;
        self.0[OFFSET_DIGITAL_OUT] = byte;
        Ok(())
    }

    /// Stage DAC channel 1 or 2. The buffer is untouched on error.
    ///
    /// # Errors
    ///
    /// `RANGE` if `value` does not fit in a byte or `channel` is not 1 or 2.
    pub fn set_analog(&mut self, value: u32, channel: u8) -> K8055Result<()> {
        let offset = Self::analog_offset(channel)?;
        let byte = u8::try_from(value).ok().ok_or_else(K8055Error::range)?;
        let slot = self.0.get_mut(offset).ok_or_else(K8055Error::range)?;
        *slot = byte;
        Ok(())
    }

    pub fn digital(&self) -> u8 {
        self.0[OFFSET_DIGITAL_OUT]
    }

    /// Staged DAC value, `None` for an invalid channel.
    pub fn analog(&self, channel: u8) -> Option<u8> {
        Self::analog_offset(channel)
            .ok()
            .and_then(|o| self.0.get(o).copied())
    }

    pub fn output_state(&self) -> OutputState {
        OutputState {
            digital: self.0[OFFSET_DIGITAL_OUT],
            dac1: self.0[OFFSET_DIGITAL_OUT + 1],
            dac2: self.0[OFFSET_DIGITAL_OUT + 2],
        }
    }

    pub fn apply(&mut self, state: OutputState) {
        self.0[OFFSET_DIGITAL_OUT] = state.digital;
        self.0[OFFSET_DIGITAL_OUT + 1] = state.dac1;
        self.0[OFFSET_DIGITAL_OUT + 2] = state.dac2;
    }

    fn analog_offset(channel: u8) -> K8055Result<usize> {
        match channel {
            1 | 2 => Ok(OFFSET_DIGITAL_OUT + usize::from(channel)),
            _ => Err(K8055Error::range()),
        }
    }
}
