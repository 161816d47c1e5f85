//! Feeds arbitrary transfer buffers to a configured simulated board.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_sim_transfer

#![deny(static_mut_refs)]
#![no_main]

use k8055_protocol::BootstrapStep;
use k8055_transport::{Opener, SimulatedBoard, Transport};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let board = SimulatedBoard::new();
    let Ok(mut transport) = board.open("$") else {
        return;
    };
    let mut configure = BootstrapStep::SetConfiguration.packet();
    if transport.transfer(configure.as_mut_bytes()).is_err() {
        return;
    }

    // Must never panic on arbitrary bytes.
    let mut buf = data.to_vec();
    let _ = transport.transfer(&mut buf);
    assert!(board.transfers().len() <= 2);
});
