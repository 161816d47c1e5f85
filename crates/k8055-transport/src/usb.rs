//! libusb backend.
//!
//! Interrupt pseudo-headers (`EC 10 ..`) become `read_interrupt` /
//! `write_interrupt` calls on the endpoint in header byte 4; every other
//! header is issued as a control transfer on EP0. SET_CONFIGURATION goes
//! through libusb's configuration API, which requires the interface to be
//! released first.

use std::time::Duration;

use k8055_protocol::ids::{CONFIGURATION, INTERFACE};
use k8055_protocol::packet::{self, TransferKind, classify};
use k8055_protocol::setup::{DIR_IN, SETUP_HEADER_LEN, SetupPacket, request};
use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info, trace, warn};

use crate::name::DeviceSelector;
use crate::{Opener, Transport, TransportError, TransportResult};

/// Default timeout per USB transfer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Opens boards through libusb.
#[derive(Debug, Clone, Copy)]
pub struct UsbOpener {
    timeout: Duration,
}

impl Default for UsbOpener {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl UsbOpener {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Opener for UsbOpener {
    type Transport = UsbTransport;

    fn open(&self, name: &str) -> TransportResult<UsbTransport> {
        let selector: DeviceSelector = name.parse()?;
        let mut handle =
            rusb::open_device_with_vid_pid(selector.vendor_id(), selector.product_id())
                .ok_or_else(|| TransportError::NotFound(name.to_string()))?;

        if rusb::supports_detach_kernel_driver() {
            handle.set_auto_detach_kernel_driver(true)?;
        }
        handle.claim_interface(INTERFACE)?;
        info!(device = name, selector = %selector, "opened K8055");

        Ok(UsbTransport {
            handle,
            name: name.to_string(),
            timeout: self.timeout,
            claimed: true,
        })
    }
}

/// An open board.
pub struct UsbTransport {
    handle: DeviceHandle<GlobalContext>,
    name: String,
    timeout: Duration,
    claimed: bool,
}

impl std::fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbTransport")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("claimed", &self.claimed)
            .finish_non_exhaustive()
    }
}

impl UsbTransport {
    fn set_configuration(&mut self, value: u8) -> TransportResult<()> {
        if self.handle.active_configuration()? == value {
            debug!(value, "configuration already active");
            return Ok(());
        }
        if self.claimed {
            self.handle.release_interface(INTERFACE)?;
            self.claimed = false;
        }
        self.handle.set_active_configuration(value)?;
        self.handle.claim_interface(INTERFACE)?;
        self.claimed = true;
        Ok(())
    }

    fn control(&mut self, setup: SetupPacket, payload: &mut [u8]) -> TransportResult<usize> {
        if setup.request_type == 0x00 && setup.request == request::SET_CONFIGURATION {
            let value = u8::try_from(setup.value).unwrap_or(CONFIGURATION);
            self.set_configuration(value)?;
            return Ok(0);
        }
        let len = usize::from(setup.length).min(payload.len());
        let data = payload.get_mut(..len).unwrap_or_default();
        let n = if setup.is_in() {
            self.handle.read_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                data,
                self.timeout,
            )?
        } else {
            self.handle.write_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                data,
                self.timeout,
            )?
        };
        Ok(n)
    }
}

/// Write the reply length into the header. An IN interrupt read flips the
/// toggle bit only when the board actually returned data, so an empty read
/// still shows up as stale.
fn record_reply(buf: &mut [u8], kind: TransferKind, n: usize) {
    if let TransferKind::Interrupt {
        endpoint, toggle, ..
    } = kind
    {
        if endpoint & DIR_IN != 0 && n > 0 {
            packet::set_toggle_bit(buf, !toggle);
        }
    }
    packet::set_reply_len(buf, u16::try_from(n).unwrap_or(u16::MAX));
}

impl Transport for UsbTransport {
    fn transfer(&mut self, buf: &mut [u8]) -> TransportResult<()> {
        let kind = classify(buf)
            .ok_or_else(|| TransportError::MalformedPacket(format!("{} bytes", buf.len())))?;
        let payload = buf.get_mut(SETUP_HEADER_LEN..).unwrap_or_default();

        let n = match kind {
            TransferKind::Control(setup) => self.control(setup, payload)?,
            TransferKind::Interrupt {
                endpoint, length, ..
            } => {
                let len = usize::from(length).min(payload.len());
                let data = payload.get_mut(..len).unwrap_or_default();
                if endpoint & DIR_IN != 0 {
                    self.handle.read_interrupt(endpoint, data, self.timeout)?
                } else {
                    self.handle.write_interrupt(endpoint, data, self.timeout)?
                }
            }
        };

        record_reply(buf, kind, n);
        trace!(device = %self.name, packet = %packet::hex_dump(buf), "usb transfer");
        Ok(())
    }

    fn close(mut self) -> TransportResult<()> {
        if self.claimed {
            self.claimed = false;
            self.handle.release_interface(INTERFACE)?;
        }
        info!(device = %self.name, "closed K8055");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if self.claimed {
            if let Err(e) = self.handle.release_interface(INTERFACE) {
                warn!(device = %self.name, error = %e, "failed to release interface");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8055_protocol::ids::{EP_DATA_IN, EP_DATA_OUT};
    use k8055_protocol::packet::{interrupt_header, reply_len, toggle_bit};

    fn interrupt(endpoint: u8) -> Result<(Vec<u8>, TransferKind), String> {
        let mut buf = interrupt_header(endpoint, 8).to_vec();
        buf.resize(SETUP_HEADER_LEN + 8, 0);
        let kind = classify(&buf).ok_or("not an interrupt packet")?;
        Ok((buf, kind))
    }

    #[test]
    fn full_read_flips_toggle() -> Result<(), String> {
        let (mut buf, kind) = interrupt(EP_DATA_IN)?;
        record_reply(&mut buf, kind, 8);
        assert!(toggle_bit(&buf));
        assert_eq!(reply_len(&buf), Some(8));
        Ok(())
    }

    #[test]
    fn empty_read_keeps_toggle() -> Result<(), String> {
        let (mut buf, kind) = interrupt(EP_DATA_IN)?;
        record_reply(&mut buf, kind, 0);
        assert!(!toggle_bit(&buf));
        assert_eq!(reply_len(&buf), Some(0));
        Ok(())
    }

    #[test]
    fn write_never_flips_toggle() -> Result<(), String> {
        let (mut buf, kind) = interrupt(EP_DATA_OUT)?;
        record_reply(&mut buf, kind, 8);
        assert!(!toggle_bit(&buf));
        Ok(())
    }
}
