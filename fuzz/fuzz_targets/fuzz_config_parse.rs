//! Fuzzes YAML board configuration parsing and validation.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_config_parse

#![deny(static_mut_refs)]
#![no_main]

use k8055dd::BoardConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(config) = BoardConfig::from_yaml_str(text) {
            assert!(config.selector().is_ok());
        }
    }
});
