//! Device name parsing.
//!
//! Accepted forms:
//! - `"0"` .. `"3"`: card address selected by the SK5/SK6 jumpers
//! - `"K8055_<n>"`: the same, with a prefix (case-insensitive)
//! - `"$"`: card 0, the name used by older tools as a placeholder
//! - `"VVVV:PPPP"`: explicit hexadecimal vendor and product ID

use core::fmt;
use core::str::FromStr;

use k8055_protocol::ids::{VENDOR_ID, card_address, product_id_for_card};

use crate::TransportError;

/// Placeholder name that selects card 0.
pub const DEFAULT_DEVICE_NAME: &str = "$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceSelector {
    /// Card address 0..=3.
    Card(u8),
    /// Explicit USB IDs.
    Ids { vendor_id: u16, product_id: u16 },
}

impl DeviceSelector {
    pub fn vendor_id(&self) -> u16 {
        match self {
            Self::Card(_) => VENDOR_ID,
            Self::Ids { vendor_id, .. } => *vendor_id,
        }
    }

    pub fn product_id(&self) -> u16 {
        match self {
            Self::Card(address) => product_id_for_card(*address).unwrap_or_default(),
            Self::Ids { product_id, .. } => *product_id,
        }
    }

    /// Card address, if the selector refers to a K8055.
    pub fn card(&self) -> Option<u8> {
        match self {
            Self::Card(address) => Some(*address),
            Self::Ids {
                vendor_id,
                product_id,
            } if *vendor_id == VENDOR_ID => card_address(*product_id),
            Self::Ids { .. } => None,
        }
    }

    fn parse_card(digits: &str, name: &str) -> Result<Self, TransportError> {
        digits
            .parse::<u8>()
            .ok()
            .filter(|a| product_id_for_card(*a).is_some())
            .map(Self::Card)
            .ok_or_else(|| TransportError::InvalidName(name.to_string()))
    }
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::Card(0)
    }
}

impl FromStr for DeviceSelector {
    type Err = TransportError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let trimmed = name.trim();
        if trimmed == DEFAULT_DEVICE_NAME {
            return Ok(Self::Card(0));
        }
        if let Some((vid, pid)) = trimmed.split_once(':') {
            let parse = |s: &str| u16::from_str_radix(s, 16).ok();
            return match (parse(vid), parse(pid)) {
                (Some(vendor_id), Some(product_id)) => Ok(Self::Ids {
                    vendor_id,
                    product_id,
                }),
                _ => Err(TransportError::InvalidName(name.to_string())),
            };
        }
        let digits = match trimmed.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("K8055_") => {
                trimmed.get(6..).unwrap_or_default()
            }
            _ => trimmed,
        };
        Self::parse_card(digits, name)
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card(address) => write!(f, "K8055_{address}"),
            Self::Ids {
                vendor_id,
                product_id,
            } => write!(f, "{vendor_id:04X}:{product_id:04X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_selects_card_zero() -> Result<(), TransportError> {
        assert_eq!("$".parse::<DeviceSelector>()?, DeviceSelector::Card(0));
        Ok(())
    }

    #[test]
    fn card_forms() -> Result<(), TransportError> {
        assert_eq!("2".parse::<DeviceSelector>()?, DeviceSelector::Card(2));
        assert_eq!("K8055_3".parse::<DeviceSelector>()?, DeviceSelector::Card(3));
        assert_eq!("k8055_1".parse::<DeviceSelector>()?.product_id(), 0x5501);
        Ok(())
    }

    #[test]
    fn explicit_ids() -> Result<(), TransportError> {
        let sel: DeviceSelector = "10CF:5502".parse()?;
        assert_eq!(sel.vendor_id(), 0x10CF);
        assert_eq!(sel.card(), Some(2));
        let other: DeviceSelector = "0483:a355".parse()?;
        assert_eq!(other.card(), None);
        assert_eq!(other.to_string(), "0483:A355");
        Ok(())
    }

    #[test]
    fn bad_names_are_rejected() {
        for name in ["4", "K8055_9", "KDEV01", "", "10CF:", "xyz:5500"] {
            assert!(
                matches!(name.parse::<DeviceSelector>(), Err(TransportError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
