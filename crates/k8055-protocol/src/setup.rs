//! USB setup packet encoding for the 8-byte transfer header.

/// Length of the transfer header that precedes every payload.
pub const SETUP_HEADER_LEN: usize = 8;

/// Standard request codes (USB 2.0 table 9-4).
pub mod request {
    /// GET_DESCRIPTOR.
    pub const GET_DESCRIPTOR: u8 = 0x06;
    /// SET_CONFIGURATION.
    pub const SET_CONFIGURATION: u8 = 0x09;
    /// HID class SET_IDLE, issued by the optional vendor step.
    pub const SET_IDLE: u8 = 0x0A;
}

/// Descriptor types (USB 2.0 table 9-5, HID 1.11 section 7.1).
pub mod descriptor {
    /// Device descriptor.
    pub const DEVICE: u8 = 0x01;
    /// Configuration descriptor.
    pub const CONFIGURATION: u8 = 0x02;
    /// String descriptor.
    pub const STRING: u8 = 0x03;
    /// HID report descriptor.
    pub const HID_REPORT: u8 = 0x22;
}

/// LANGID for US English string descriptors.
pub const LANGID_EN_US: u16 = 0x0409;

/// `bmRequestType` direction bit: device to host.
pub const DIR_IN: u8 = 0x80;

/// A USB control setup packet, `bmRequestType bRequest wValue wIndex wLength`.
///
/// Multi-byte fields are little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub const fn new(request_type: u8, request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            request_type,
            request,
            value,
            index,
            length,
        }
    }

    /// GET_DESCRIPTOR for `descriptor_type`/`descriptor_index`.
    pub const fn get_descriptor(
        descriptor_type: u8,
        descriptor_index: u8,
        language: u16,
        length: u16,
    ) -> Self {
        Self::new(
            DIR_IN,
            request::GET_DESCRIPTOR,
            ((descriptor_type as u16) << 8) | descriptor_index as u16,
            language,
            length,
        )
    }

    /// Returns `true` for device-to-host requests.
    pub const fn is_in(&self) -> bool {
        self.request_type & DIR_IN != 0
    }

    /// Encode into the 8-byte header layout.
    pub fn to_bytes(&self) -> [u8; SETUP_HEADER_LEN] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    /// Decode the first 8 bytes of `bytes`, `None` if it is shorter.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let header: &[u8; SETUP_HEADER_LEN] = bytes.get(..SETUP_HEADER_LEN)?.try_into().ok()?;
        Some(Self {
            request_type: header[0],
            request: header[1],
            value: u16::from_le_bytes([header[2], header[3]]),
            index: u16::from_le_bytes([header[4], header[5]]),
            length: u16::from_le_bytes([header[6], header[7]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_descriptor_request_layout() {
        let setup = SetupPacket::get_descriptor(descriptor::DEVICE, 0, 0, 18);
        assert_eq!(setup.to_bytes(), [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]);
        assert!(setup.is_in());
    }

    #[test]
    fn string_descriptor_carries_langid() {
        let setup = SetupPacket::get_descriptor(descriptor::STRING, 2, LANGID_EN_US, 20);
        assert_eq!(setup.to_bytes(), [0x80, 0x06, 0x02, 0x03, 0x09, 0x04, 0x14, 0x00]);
    }

    #[test]
    fn decode_reads_little_endian_fields() -> Result<(), Box<dyn std::error::Error>> {
        let setup = SetupPacket::from_bytes(&[0x81, 0x06, 0x00, 0x22, 0x00, 0x00, 0x1E, 0x00, 0xFF])
            .ok_or("short header")?;
        assert_eq!(setup.value, 0x2200);
        assert_eq!(setup.length, 30);
        Ok(())
    }

    #[test]
    fn short_header_is_rejected() {
        assert_eq!(SetupPacket::from_bytes(&[0x80, 0x06, 0x00]), None);
    }
}
