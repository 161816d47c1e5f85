//! Digital input decoding.
//!
//! The board reports its five digital inputs in a scrambled bit order:
//!
//! | Input | Raw bit | Decoded bit |
//! |-------|---------|-------------|
//! | I1    | `0x10`  | `0x01`      |
//! | I2    | `0x20`  | `0x02`      |
//! | I3    | `0x01`  | `0x04`      |
//! | I4    | `0x40`  | `0x08`      |
//! | I5    | `0x80`  | `0x10`      |
//!
//! Raw bits `0x02`, `0x04` and `0x08` are never set by a healthy board and are
//! treated as a range error.

use crate::error::{K8055Error, K8055Result};

/// Raw mask of inputs I1..I5, indexed by input number minus one.
pub const RAW_INPUT_MASK: [u8; 5] = [0x10, 0x20, 0x01, 0x40, 0x80];

/// One of the five digital inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalInput {
    I1,
    I2,
    I3,
    I4,
    I5,
}

impl DigitalInput {
    pub const ALL: [Self; 5] = [Self::I1, Self::I2, Self::I3, Self::I4, Self::I5];

    /// Input for a 1-based index.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::I1),
            2 => Some(Self::I2),
            3 => Some(Self::I3),
            4 => Some(Self::I4),
            5 => Some(Self::I5),
            _ => None,
        }
    }

    pub const fn index(self) -> u8 {
        match self {
            Self::I1 => 1,
            Self::I2 => 2,
            Self::I3 => 3,
            Self::I4 => 4,
            Self::I5 => 5,
        }
    }

    /// Bit in the raw input byte.
    pub const fn raw_mask(self) -> u8 {
        match self {
            Self::I1 => 0x10,
            Self::I2 => 0x20,
            Self::I3 => 0x01,
            Self::I4 => 0x40,
            Self::I5 => 0x80,
        }
    }

    /// Bit in the decoded value.
    pub const fn decoded_mask(self) -> u8 {
        1 << (self.index() - 1)
    }
}

/// State of a single input as reported by [`DigitalInputState::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DigitalInputState {
    Released = 0,
    Pressed = 1,
    /// Index outside 1..=5.
    Invalid = 2,
}

impl DigitalInputState {
    pub fn check(raw: u8, index: u8) -> Self {
        match DigitalInput::from_index(index) {
            Some(input) if raw & input.raw_mask() != 0 => Self::Pressed,
            Some(_) => Self::Released,
            None => Self::Invalid,
        }
    }

    /// Numeric value: 0, 1, or 2 for an invalid index.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Decode the raw input byte into `I5..I1` order (bit 0 = I1).
///
/// Bits are consumed from the most significant weight down, so the first
/// invalid bit found stops decoding.
///
/// # Errors
///
/// `RANGE` if `raw` exceeds 255 or has any of the bits `0x02`, `0x04`, `0x08`.
pub fn decode_digital_inputs(raw: u32) -> K8055Result<u8> {
    if raw > 0xFF {
        return Err(K8055Error::range());
    }
    let mut rest = raw;
    let mut decoded = 0u8;
    for (weight, bit) in [(128, 0x10), (64, 0x08), (32, 0x02), (16, 0x01)] {
        if rest >= weight {
            rest -= weight;
            decoded |= bit;
        }
    }
    match rest {
        0 => Ok(decoded),
        1 => Ok(decoded | 0x04),
        _ => Err(K8055Error::range()),
    }
}

/// Test one input (index 1..=5) of a raw input byte, returning 0 or 1.
///
/// # Errors
///
/// `RANGE` for an index outside 1..=5; the corresponding state is
/// [`DigitalInputState::Invalid`].
pub fn check_digital_input(raw: u8, index: u8) -> K8055Result<u8> {
    match DigitalInputState::check(raw, index) {
        DigitalInputState::Invalid => Err(K8055Error::range()),
        state => Ok(state.code()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_masks_follow_the_mask_table() {
        let masks: Vec<u8> = DigitalInput::ALL.iter().map(|i| i.raw_mask()).collect();
        assert_eq!(masks, RAW_INPUT_MASK);
    }

    #[test]
    fn single_inputs_decode_to_their_bit() -> Result<(), K8055Error> {
        for input in DigitalInput::ALL {
            assert_eq!(
                decode_digital_inputs(u32::from(input.raw_mask()))?,
                input.decoded_mask()
            );
        }
        Ok(())
    }

    #[test]
    fn known_values() -> Result<(), K8055Error> {
        assert_eq!(decode_digital_inputs(0x00)?, 0x00);
        assert_eq!(decode_digital_inputs(0x10)?, 0x01);
        assert_eq!(decode_digital_inputs(0x30)?, 0x03);
        assert_eq!(decode_digital_inputs(0xF0)?, 0x1B);
        assert_eq!(decode_digital_inputs(0xF1)?, 0x1F);
        Ok(())
    }

    #[test]
    fn invalid_bits_are_range_errors() {
        for raw in [0x02, 0x04, 0x08, 0xF2, 0x0F, 0x100, u32::MAX] {
            assert_eq!(decode_digital_inputs(raw), Err(K8055Error::range()), "{raw:#x}");
        }
    }

    #[test]
    fn check_reports_pressed_and_released() {
        assert_eq!(check_digital_input(0x01, 3), Ok(1));
        assert_eq!(check_digital_input(0x01, 1), Ok(0));
        assert_eq!(check_digital_input(0x80, 5), Ok(1));
    }

    #[test]
    fn check_rejects_bad_index() {
        assert_eq!(DigitalInputState::check(0xFF, 0).code(), 2);
        assert_eq!(DigitalInputState::check(0xFF, 6), DigitalInputState::Invalid);
        assert_eq!(check_digital_input(0xFF, 6), Err(K8055Error::range()));
    }
}
