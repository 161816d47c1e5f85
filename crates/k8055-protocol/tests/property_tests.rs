//! Property-based tests for the K8055 protocol crate.
//!
//! Uses proptest with 500 cases to verify invariants on:
//! - digital input decoding (bijection on valid bytes, range errors otherwise)
//! - single-input checks
//! - counter extraction and output staging
//! - packet classification of arbitrary headers

use k8055_protocol::packet::{self, classify};
use k8055_protocol::{
    DigitalInput, ErrorKinds, GetDataBuffer, K8055Error, PutDataBuffer, TransferKind,
    check_digital_input, decode_digital_inputs, info_byte,
};
use proptest::prelude::*;

const VALID_RAW_BITS: u8 = 0x10 | 0x20 | 0x01 | 0x40 | 0x80;

/// Reference decode: move each raw bit to its decoded position.
fn decode_reference(raw: u8) -> u8 {
    DigitalInput::ALL
        .into_iter()
        .filter(|input| raw & input.raw_mask() != 0)
        .fold(0, |acc, input| acc | input.decoded_mask())
}

// ── Fixed examples ────────────────────────────────────────────────────────────

#[test]
fn test_documented_decode_examples() -> Result<(), Box<dyn std::error::Error>> {
    assert_eq!(decode_digital_inputs(0x10)?, 0x01);
    assert_eq!(decode_digital_inputs(0x30)?, 0x03);
    assert_eq!(decode_digital_inputs(0xF0)?, 0x1B);
    assert_eq!(decode_digital_inputs(0xF1)?, 0x1F);
    assert_eq!(decode_digital_inputs(0xF2), Err(K8055Error::range()));
    Ok(())
}

/// Staged digital values land at offset 9; out-of-range values change nothing.
#[test]
fn test_digital_out_every_value() -> Result<(), Box<dyn std::error::Error>> {
    for value in 0..=256u32 {
        let mut buf = PutDataBuffer::new();
        let before = buf;
        let result = buf.set_digital(value);
        if let Ok(byte) = u8::try_from(value) {
            assert_eq!(result, Ok(()), "{value}");
            assert_eq!(buf.as_bytes().get(9).copied(), Some(byte), "{value}");
            assert_eq!(buf.digital(), byte);
        } else {
            assert_eq!(result, Err(K8055Error::range()));
            assert_eq!(buf, before);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(500))]

    // ── Digital inputs ────────────────────────────────────────────────────────

    /// Bytes built only from the five input bits decode like the reference
    /// mapping, and the decoded value only uses the low five bits.
    #[test]
    fn prop_valid_raw_bytes_decode_to_reference(raw in any::<u8>()) {
        let raw = raw & VALID_RAW_BITS;
        let decoded = decode_digital_inputs(u32::from(raw));
        prop_assert_eq!(decoded, Ok(decode_reference(raw)));
        prop_assert_eq!(decode_reference(raw) & !0x1F, 0);
    }

    /// Decoding is injective on valid bytes.
    #[test]
    fn prop_decode_is_injective(a in any::<u8>(), b in any::<u8>()) {
        let (a, b) = (a & VALID_RAW_BITS, b & VALID_RAW_BITS);
        prop_assume!(a != b);
        prop_assert_ne!(decode_digital_inputs(u32::from(a)), decode_digital_inputs(u32::from(b)));
    }

    /// Any of the bits 0x02, 0x04, 0x08 makes the byte a range error.
    #[test]
    fn prop_invalid_bits_are_range_errors(raw in any::<u8>(), bad in prop::sample::select(vec![0x02u8, 0x04, 0x08])) {
        let raw = raw | bad;
        prop_assert_eq!(decode_digital_inputs(u32::from(raw)), Err(K8055Error::range()));
    }

    /// Values above one byte are always rejected.
    #[test]
    fn prop_wide_values_are_range_errors(raw in 0x100u32..) {
        prop_assert_eq!(decode_digital_inputs(raw), Err(K8055Error::range()));
    }

    /// A valid index yields 0 or 1 matching the raw bit; anything else is RANGE.
    #[test]
    fn prop_check_digital_input(raw in any::<u8>(), index in any::<u8>()) {
        match DigitalInput::from_index(index) {
            Some(input) => {
                let expected = u8::from(raw & input.raw_mask() != 0);
                prop_assert_eq!(check_digital_input(raw, index), Ok(expected));
            }
            None => {
                let err = check_digital_input(raw, index).err().map(|e| e.kinds());
                prop_assert_eq!(err, Some(ErrorKinds::RANGE));
            }
        }
    }

    // ── Data buffers ──────────────────────────────────────────────────────────

    /// Counters are `lo + 256 * hi` at offsets 12/13 and 14/15.
    #[test]
    fn prop_counter_combines_bytes(bytes in any::<[u8; 4]>()) {
        let mut buf = GetDataBuffer::new();
        buf.as_mut_bytes()[12..16].copy_from_slice(&bytes);
        let c1 = u16::from(bytes[0]) + 256 * u16::from(bytes[1]);
        let c2 = u16::from(bytes[2]) + 256 * u16::from(bytes[3]);
        prop_assert_eq!(buf.counter(1), Ok(c1));
        prop_assert_eq!(buf.counter(2), Ok(c2));
    }

    /// Only channels 1 and 2 are accepted.
    #[test]
    fn prop_analog_channel_bounds(value in any::<u8>(), channel in any::<u8>()) {
        let mut buf = PutDataBuffer::new();
        let result = buf.set_analog(u32::from(value), channel);
        if channel == 1 || channel == 2 {
            prop_assert_eq!(result, Ok(()));
            prop_assert_eq!(buf.as_bytes()[9 + usize::from(channel)], value);
        } else {
            prop_assert_eq!(result, Err(K8055Error::range()));
            prop_assert_eq!(buf, PutDataBuffer::new());
        }
    }

    // ── Packets ───────────────────────────────────────────────────────────────

    /// Every buffer of at least 8 bytes classifies, and the reply length
    /// written back is what is read.
    #[test]
    fn prop_any_header_classifies(mut bytes in prop::collection::vec(any::<u8>(), 8..64), len in any::<u16>()) {
        let kind = classify(&bytes);
        prop_assert!(kind.is_some());
        if bytes[0] == 0xEC && bytes[1] & !0x08 == 0x10 {
            let is_interrupt = matches!(kind, Some(TransferKind::Interrupt { .. }));
            prop_assert!(is_interrupt);
        }
        prop_assert!(packet::set_reply_len(&mut bytes, len));
        prop_assert_eq!(packet::reply_len(&bytes), Some(len));
    }

    /// Info bytes are defined exactly for 1..=6 x 1..=33.
    #[test]
    fn prop_info_byte_bounds(section in 0usize..10, byte in 0usize..40) {
        let in_range = (1..=6).contains(&section) && (1..=33).contains(&byte);
        prop_assert_eq!(info_byte(section, byte).is_ok(), in_range);
    }
}
