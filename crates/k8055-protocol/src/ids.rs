//! Velleman K8055 (VM110) USB identifiers and endpoint constants.
//!
//! The board ships with two address jumpers (SK5/SK6) that add the card
//! address to the base product ID, so up to four boards can share one host:
//!
//! | Address | SK5 | SK6 | PID      |
//! |---------|-----|-----|----------|
//! | 0       | on  | on  | `0x5500` |
//! | 1       | off | on  | `0x5501` |
//! | 2       | on  | off | `0x5502` |
//! | 3       | off | off | `0x5503` |

/// Velleman Components N.V. USB Vendor ID.
pub const VENDOR_ID: u16 = 0x10CF;

/// Product ID of a board with card address 0.
pub const PID_BASE: u16 = 0x5500;

/// Number of selectable card addresses.
pub const MAX_CARDS: u8 = 4;

/// The single interface used for all transfers.
pub const INTERFACE: u8 = 0;

/// Configuration value selected during bootstrap.
pub const CONFIGURATION: u8 = 1;

/// Interrupt IN endpoint carrying the 8-byte input report.
pub const EP_DATA_IN: u8 = 0x81;

/// Interrupt OUT endpoint carrying the 8-byte output report.
pub const EP_DATA_OUT: u8 = 0x01;

/// Product ID for a card address, `None` if the address is not 0..=3.
pub fn product_id_for_card(address: u8) -> Option<u16> {
    (address < MAX_CARDS).then(|| PID_BASE + u16::from(address))
}

/// Card address encoded in a product ID, `None` for foreign PIDs.
pub fn card_address(product_id: u16) -> Option<u8> {
    let offset = product_id.checked_sub(PID_BASE)?;
    u8::try_from(offset).ok().filter(|a| *a < MAX_CARDS)
}

/// Returns `true` if the VID/PID pair belongs to a K8055 board.
pub fn is_k8055(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == VENDOR_ID && card_address(product_id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_addresses_map_to_consecutive_pids() {
        assert_eq!(product_id_for_card(0), Some(0x5500));
        assert_eq!(product_id_for_card(3), Some(0x5503));
        assert_eq!(product_id_for_card(4), None);
    }

    #[test]
    fn card_address_round_trips() {
        for address in 0..MAX_CARDS {
            let pid = product_id_for_card(address);
            assert_eq!(pid.and_then(card_address), Some(address));
        }
    }

    #[test]
    fn foreign_ids_are_rejected() {
        assert!(is_k8055(0x10CF, 0x5502));
        assert!(!is_k8055(0x10CF, 0x5504));
        assert!(!is_k8055(0x10CF, 0x54FF));
        assert!(!is_k8055(0x0483, 0x5500));
    }
}
