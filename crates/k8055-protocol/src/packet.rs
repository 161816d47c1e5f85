//! Transfer packets: an 8-byte header followed by a fixed-capacity payload.
//!
//! A header whose first two bytes are `EC 10` (or `EC 18` with the toggle bit
//! set) describes an interrupt transfer on the endpoint in byte 4; any other
//! header is a control setup packet. After a transfer the transport stores the
//! observed reply length in header bytes 6..8.

use crate::setup::{SETUP_HEADER_LEN, SetupPacket};

/// First header byte of an interrupt pseudo-header.
pub const INTERRUPT_MARKER: u8 = 0xEC;
/// Second header byte of an interrupt pseudo-header, toggle bit cleared.
pub const INTERRUPT_REQUEST: u8 = 0x10;
/// Transfer type stored in header byte 5 (USB endpoint type "interrupt").
pub const INTERRUPT_TRANSFER_TYPE: u8 = 0x03;
/// Mask of the data toggle bit in header byte 1.
pub const TOGGLE_MASK: u8 = 0x08;

/// Largest payload shown by [`hex_dump`].
pub const HEX_DUMP_PAYLOAD_LIMIT: usize = 48;

/// What a header asks the transport to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Control transfer on EP0.
    Control(SetupPacket),
    /// Interrupt transfer of `length` bytes on `endpoint`.
    Interrupt {
        endpoint: u8,
        length: u16,
        toggle: bool,
    },
}

impl TransferKind {
    /// Requested payload length.
    pub fn length(&self) -> u16 {
        match self {
            Self::Control(setup) => setup.length,
            Self::Interrupt { length, .. } => *length,
        }
    }
}

/// Build an interrupt pseudo-header for `endpoint`.
pub fn interrupt_header(endpoint: u8, length: u16) -> [u8; SETUP_HEADER_LEN] {
    let len = length.to_le_bytes();
    [
        INTERRUPT_MARKER,
        INTERRUPT_REQUEST,
        0x00,
        0x00,
        endpoint,
        INTERRUPT_TRANSFER_TYPE,
        len[0],
        len[1],
    ]
}

/// Classify a transfer buffer by its header. `None` if shorter than a header.
pub fn classify(buf: &[u8]) -> Option<TransferKind> {
    let setup = SetupPacket::from_bytes(buf)?;
    if setup.request_type == INTERRUPT_MARKER && setup.request & !TOGGLE_MASK == INTERRUPT_REQUEST
    {
        let [endpoint, _] = setup.index.to_le_bytes();
        Some(TransferKind::Interrupt {
            endpoint,
            length: setup.length,
            toggle: setup.request & TOGGLE_MASK != 0,
        })
    } else {
        Some(TransferKind::Control(setup))
    }
}

/// Length field (header bytes 6..8).
pub fn reply_len(buf: &[u8]) -> Option<u16> {
    match buf.get(6..SETUP_HEADER_LEN)? {
        [lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// Store `len` in the length field. Returns `false` if `buf` is too short.
pub fn set_reply_len(buf: &mut [u8], len: u16) -> bool {
    match buf.get_mut(6..SETUP_HEADER_LEN) {
        Some(field) => {
            field.copy_from_slice(&len.to_le_bytes());
            true
        }
        None => false,
    }
}

/// Current state of the toggle bit.
pub fn toggle_bit(buf: &[u8]) -> bool {
    buf.get(1).is_some_and(|b| b & TOGGLE_MASK != 0)
}

/// Set or clear the toggle bit.
pub fn set_toggle_bit(buf: &mut [u8], on: bool) {
    if let Some(b) = buf.get_mut(1) {
        if on {
            *b |= TOGGLE_MASK;
        } else {
            *b &= !TOGGLE_MASK;
        }
    }
}

/// Hex dump of the header and at most 48 payload bytes, in groups of 8.
pub fn hex_dump(buf: &[u8]) -> String {
    let shown = buf.len().min(SETUP_HEADER_LEN + HEX_DUMP_PAYLOAD_LIMIT);
    let mut out = String::with_capacity(shown * 3 + shown / 8 * 2);
    for (i, chunk) in buf.get(..shown).unwrap_or_default().chunks(8).enumerate() {
        if i > 0 {
            out.push_str(" | ");
        }
        for (j, byte) in chunk.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{byte:02X}"));
        }
    }
    if buf.len() > shown {
        out.push_str(" ..");
    }
    out
}

/// An owned transfer buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    /// Control transfer with room for `capacity` payload bytes.
    pub fn control(setup: SetupPacket, capacity: usize) -> Self {
        let mut bytes = setup.to_bytes().to_vec();
        bytes.resize(SETUP_HEADER_LEN + capacity, 0);
        Self { bytes }
    }

    /// Interrupt transfer of `length` bytes on `endpoint`.
    pub fn interrupt(endpoint: u8, length: u16) -> Self {
        let mut bytes = interrupt_header(endpoint, length).to_vec();
        bytes.resize(SETUP_HEADER_LEN + usize::from(length), 0);
        Self { bytes }
    }

    /// Wrap an existing buffer. `None` if it cannot hold a header.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() >= SETUP_HEADER_LEN).then_some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Header bytes.
    pub fn header(&self) -> &[u8] {
        self.bytes.get(..SETUP_HEADER_LEN).unwrap_or_default()
    }

    /// Payload area (everything after the header).
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(SETUP_HEADER_LEN..).unwrap_or_default()
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.bytes.get_mut(SETUP_HEADER_LEN..).unwrap_or_default()
    }

    /// Capacity of the payload area.
    pub fn capacity(&self) -> usize {
        self.bytes.len().saturating_sub(SETUP_HEADER_LEN)
    }

    pub fn kind(&self) -> Option<TransferKind> {
        classify(&self.bytes)
    }

    pub fn reply_len(&self) -> u16 {
        reply_len(&self.bytes).unwrap_or(0)
    }

    pub fn set_reply_len(&mut self, len: u16) {
        set_reply_len(&mut self.bytes, len);
    }

    pub fn toggle_bit(&self) -> bool {
        toggle_bit(&self.bytes)
    }

    pub fn hex_dump(&self) -> String {
        hex_dump(&self.bytes)
    }
}
