//! Library information strings.
//!
//! Six fixed-width entries of 32 printable characters plus a NUL terminator.
//! Each entry starts with its 1-based index and a blank; entry 1 is a ruler
//! that shows the usable width.

use crate::error::{K8055Error, K8055Result};

/// Number of info entries.
pub const INFO_ENTRIES: usize = 6;

/// Bytes per entry, terminator included.
pub const INFO_ENTRY_LEN: usize = 33;

const INFO_TEXT_LEN: usize = INFO_ENTRY_LEN - 1;

// Each entry is padded to exactly 32 bytes; the terminator is implicit.
static INFO_TABLE: [&str; INFO_ENTRIES] = [
    "1 abcdefghijklmnopqrstuvwxyzABCD",
    "2 Authors: K8055DD contributors ",
    "3 Date: 2026-10-17              ",
    "4 Version: 0.1.0                ",
    "5 Licence: MIT OR Apache-2.0    ",
    "6 Name: k8055dd                 ",
];

fn entry(index: usize) -> K8055Result<&'static str> {
    index
        .checked_sub(1)
        .and_then(|i| INFO_TABLE.get(i))
        .copied()
        .ok_or_else(K8055Error::range)
}

/// Entry `index` (1..=6) without its terminator, trailing blanks kept.
///
/// # Errors
///
/// `RANGE` for an index outside 1..=6.
pub fn info_string(index: usize) -> K8055Result<&'static str> {
    entry(index)
}

/// Byte `byte` (1..=33) of entry `section` (1..=6). Byte 33 is the terminator.
///
/// # Errors
///
/// `RANGE` if either index is out of bounds.
pub fn info_byte(section: usize, byte: usize) -> K8055Result<u8> {
    let text = entry(section)?.as_bytes();
    match byte.checked_sub(1) {
        Some(INFO_TEXT_LEN) => Ok(0),
        Some(i) if i < INFO_TEXT_LEN => text.get(i).copied().ok_or_else(K8055Error::range),
        _ => Err(K8055Error::range()),
    }
}
