//! Fuzzes transfer buffer classification and the header accessors.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_packet_classify

#![deny(static_mut_refs)]
#![no_main]

use k8055_protocol::packet::{classify, hex_dump, reply_len, set_reply_len, toggle_bit};
use k8055_protocol::{Packet, SetupPacket};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let kind = classify(data);
    if let Some(kind) = kind {
        assert!(data.len() >= 8);
    }
    let _ = SetupPacket::from_bytes(data);
    let _ = reply_len(data);
    let _ = toggle_bit(data);
    let _ = hex_dump(data);

    let mut buf = data.to_vec();
    if set_reply_len(&mut buf, 8) {
        assert_eq!(reply_len(&buf), Some(8));
    }

    if let Some(packet) = Packet::from_bytes(data.to_vec()) {
        assert_eq!(packet.kind(), kind);
        let _ = packet.hex_dump();
    }
});
