//! Fuzzes digital input decoding and the per-input check.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_digital_decode

#![deny(static_mut_refs)]
#![no_main]

use k8055_protocol::{ErrorKinds, check_digital_input, decode_digital_inputs};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u32, u8, u8)| {
    let (raw, byte, index) = input;
    match decode_digital_inputs(raw) {
        Ok(decoded) => assert!(decoded <= 0x1F),
        Err(e) => assert_eq!(e.kinds(), ErrorKinds::RANGE),
    }
    match check_digital_input(byte, index) {
        Ok(state) => assert!(state <= 1 && (1..=5).contains(&index)),
        Err(e) => assert!(e.contains(ErrorKinds::RANGE)),
    }
});
