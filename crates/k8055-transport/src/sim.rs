//! A simulated K8055 board.
//!
//! [`SimulatedBoard`] answers the bootstrap requests with the descriptor
//! lengths a real board reports, serves input reports from settable state and
//! records output reports. Faults can be injected per transfer. All state is
//! shared behind `Arc<Mutex<_>>`: clone the board to keep an inspection handle
//! after handing a transport to a device.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use k8055_protocol::ids::{CONFIGURATION, EP_DATA_IN, EP_DATA_OUT, VENDOR_ID, product_id_for_card};
use k8055_protocol::packet::{self, TransferKind, classify};
use k8055_protocol::report::{DATA_PAYLOAD_LEN, InputSnapshot, OUTPUT_MARKER, OutputState};
use k8055_protocol::setup::{SETUP_HEADER_LEN, SetupPacket, descriptor, request};
use k8055_protocol::{BootstrapStep, DigitalInput};
use tracing::{debug, trace};

use crate::name::DeviceSelector;
use crate::{Opener, Transport, TransportError, TransportResult};

const DEVICE_DESCRIPTOR: [u8; 18] = [
    0x12, 0x01, 0x10, 0x01, 0x00, 0x00, 0x00, 0x08, 0xCF, 0x10, 0x00, 0x55, 0x00, 0x00, 0x01,
    0x02, 0x00, 0x01,
];

const CONFIGURATION_DESCRIPTOR: [u8; 41] = [
    // configuration
    0x09, 0x02, 0x29, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32,
    // interface 0, HID
    0x09, 0x04, 0x00, 0x00, 0x02, 0x03, 0x00, 0x00, 0x00,
    // HID descriptor, report descriptor of 29 bytes
    0x09, 0x21, 0x00, 0x01, 0x00, 0x01, 0x22, 0x1D, 0x00,
    // EP81 interrupt IN, 8 bytes, 10 ms
    0x07, 0x05, 0x81, 0x03, 0x08, 0x00, 0x0A,
    // EP01 interrupt OUT, 8 bytes, 10 ms
    0x07, 0x05, 0x01, 0x03, 0x08, 0x00, 0x0A,
];

const LANGUAGE_DESCRIPTOR: [u8; 4] = [0x04, 0x03, 0x09, 0x04];

const HID_REPORT_DESCRIPTOR: [u8; 29] = [
    0x06, 0x00, 0xFF, 0x09, 0x01, 0xA1, 0x01, 0x19, 0x01, 0x29, 0x08, 0x15, 0x00, 0x26, 0xFF,
    0x00, 0x75, 0x08, 0x95, 0x08, 0x81, 0x02, 0x19, 0x01, 0x29, 0x08, 0x91, 0x02, 0xC0,
];

fn string_descriptor(text: &str) -> Vec<u8> {
    let units: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let len = u8::try_from(units.len() + 2).unwrap_or(u8::MAX);
    let mut out = vec![len, descriptor::STRING];
    out.extend(units);
    out
}

/// Identifies a transfer independently of its toggle bit and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKey {
    Control {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
    },
    Interrupt {
        endpoint: u8,
    },
}

impl TransferKey {
    pub fn of(kind: &TransferKind) -> Self {
        match kind {
            TransferKind::Control(setup) => Self::Control {
                request_type: setup.request_type,
                request: setup.request,
                value: setup.value,
                index: setup.index,
            },
            TransferKind::Interrupt { endpoint, .. } => Self::Interrupt {
                endpoint: *endpoint,
            },
        }
    }

    /// Key of the transfer issued by a bootstrap step.
    pub fn for_step(step: BootstrapStep) -> Self {
        match step {
            BootstrapStep::InitialRead => Self::Interrupt {
                endpoint: EP_DATA_IN,
            },
            other => Self::of(&TransferKind::Control(other.setup())),
        }
    }

    pub const fn data_in() -> Self {
        Self::Interrupt {
            endpoint: EP_DATA_IN,
        }
    }

    pub const fn data_out() -> Self {
        Self::Interrupt {
            endpoint: EP_DATA_OUT,
        }
    }
}

/// One transfer as seen by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub key: TransferKey,
    /// Buffer as submitted, before the reply was written.
    pub request: Vec<u8>,
    /// Reply length written back, `None` if the transfer failed.
    pub reply_len: Option<u16>,
}

#[derive(Debug)]
struct SimState {
    card: u8,
    unplugged: bool,
    open_handles: usize,
    configured: bool,
    inputs: InputSnapshot,
    counters: [u16; 2],
    outputs: OutputState,
    output_reports: Vec<Vec<u8>>,
    stall_toggle: bool,
    fail_all: bool,
    failing: HashSet<TransferKey>,
    reply_len_overrides: HashMap<TransferKey, u16>,
    transfers: Vec<TransferRecord>,
}

impl SimState {
    fn new(card: u8) -> Self {
        Self {
            card,
            unplugged: false,
            open_handles: 0,
            configured: false,
            inputs: InputSnapshot::default(),
            counters: [0; 2],
            outputs: OutputState::default(),
            output_reports: Vec::new(),
            stall_toggle: false,
            fail_all: false,
            failing: HashSet::new(),
            reply_len_overrides: HashMap::new(),
            transfers: Vec::new(),
        }
    }

    fn control_reply(&mut self, setup: &SetupPacket) -> TransportResult<Vec<u8>> {
        let [index_lo, _] = setup.value.to_le_bytes();
        let reply = match (setup.request_type, setup.request, setup.value) {
            (0x80, request::GET_DESCRIPTOR, 0x0100) => DEVICE_DESCRIPTOR.to_vec(),
            (0x80, request::GET_DESCRIPTOR, 0x0200) => CONFIGURATION_DESCRIPTOR.to_vec(),
            (0x80, request::GET_DESCRIPTOR, 0x0300) => LANGUAGE_DESCRIPTOR.to_vec(),
            (0x80, request::GET_DESCRIPTOR, v) if v >> 8 == u16::from(descriptor::STRING) => {
                match index_lo {
                    1 => string_descriptor("Velleman"),
                    2 => string_descriptor("USB K8055"),
                    _ => string_descriptor("K8055 (VM110) interface board"),
                }
            }
            (0x00, request::SET_CONFIGURATION, value) => {
                self.configured = value == u16::from(CONFIGURATION);
                Vec::new()
            }
            (0x21, request::SET_IDLE, _) => Vec::new(),
            (0x81, request::GET_DESCRIPTOR, 0x2200) => HID_REPORT_DESCRIPTOR.to_vec(),
            _ => {
                return Err(TransportError::TransferFailed(format!(
                    "stall: unsupported request {:02X} {:02X} {:04X}",
                    setup.request_type, setup.request, setup.value
                )));
            }
        };
        Ok(reply)
    }

    fn input_report(&self) -> [u8; DATA_PAYLOAD_LEN] {
        let [counter1, counter2] = self.counters;
        let [c1_lo, c1_hi] = counter1.to_le_bytes();
        let [c2_lo, c2_hi] = counter2.to_le_bytes();
        [
            self.inputs.digital_raw,
            self.card + 1,
            self.inputs.analog1,
            self.inputs.analog2,
            c1_lo,
            c1_hi,
            c2_lo,
            c2_hi,
        ]
    }

    fn execute(&mut self, buf: &mut [u8]) -> TransportResult<u16> {
        let kind = classify(buf)
            .ok_or_else(|| TransportError::MalformedPacket(format!("{} bytes", buf.len())))?;
        let key = TransferKey::of(&kind);
        if self.fail_all || self.failing.contains(&key) {
            return Err(TransportError::TransferFailed(format!(
                "injected failure for {key:?}"
            )));
        }
        let capacity = buf.len().saturating_sub(SETUP_HEADER_LEN);
        let payload = buf.get_mut(SETUP_HEADER_LEN..).unwrap_or_default();

        let written = match kind {
            TransferKind::Control(setup) => {
                let reply = self.control_reply(&setup)?;
                let n = reply
                    .len()
                    .min(usize::from(setup.length))
                    .min(capacity);
                if setup.is_in() {
                    payload
                        .iter_mut()
                        .zip(reply.iter().take(n))
                        .for_each(|(dst, src)| *dst = *src);
                }
                n
            }
            TransferKind::Interrupt {
                endpoint, length, ..
            } => {
                if !self.configured {
                    return Err(TransportError::TransferFailed(
                        "device not configured".to_string(),
                    ));
                }
                let n = usize::from(length).min(DATA_PAYLOAD_LEN).min(capacity);
                match endpoint {
                    EP_DATA_IN => {
                        let report = self.input_report();
                        payload
                            .iter_mut()
                            .zip(report.iter().take(n))
                            .for_each(|(dst, src)| *dst = *src);
                    }
                    EP_DATA_OUT => {
                        let report = payload.get(..n).unwrap_or_default().to_vec();
                        if let &[OUTPUT_MARKER, digital, dac1, dac2, ..] = report.as_slice() {
                            self.outputs = OutputState {
                                digital,
                                dac1,
                                dac2,
                            };
                        }
                        self.output_reports.push(report);
                    }
                    other => {
                        return Err(TransportError::TransferFailed(format!(
                            "no such endpoint {other:#04x}"
                        )));
                    }
                }
                n
            }
        };

        if let TransferKind::Interrupt {
            endpoint: EP_DATA_IN,
            toggle,
            ..
        } = kind
        {
            if !self.stall_toggle {
                packet::set_toggle_bit(buf, !toggle);
            }
        }

        let reply_len = self
            .reply_len_overrides
            .get(&key)
            .copied()
            .unwrap_or_else(|| u16::try_from(written).unwrap_or(u16::MAX));
        packet::set_reply_len(buf, reply_len);
        Ok(reply_len)
    }
}

/// Shared handle to a simulated board.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBoard {
    /// Board with card address 0.
    pub fn new() -> Self {
        Self::with_card(0)
    }

    /// Board answering to card address `card` (clamped to 0..=3).
    pub fn with_card(card: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(card.min(3)))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn card(&self) -> u8 {
        self.lock().card
    }

    // ── Input side ────────────────────────────────────────────────────────────

    pub fn set_inputs(&self, inputs: InputSnapshot) {
        self.lock().inputs = inputs;
    }

    pub fn set_digital_raw(&self, raw: u8) {
        self.lock().inputs.digital_raw = raw;
    }

    pub fn set_input(&self, input: DigitalInput, pressed: bool) {
        let mut state = self.lock();
        if pressed {
            state.inputs.digital_raw |= input.raw_mask();
        } else {
            state.inputs.digital_raw &= !input.raw_mask();
        }
    }

    pub fn set_analog(&self, analog1: u8, analog2: u8) {
        let mut state = self.lock();
        state.inputs.analog1 = analog1;
        state.inputs.analog2 = analog2;
    }

    /// Set counter 1 or 2; other indices are ignored.
    pub fn set_counter(&self, index: u8, value: u16) {
        let mut state = self.lock();
        if let Some(counter) = usize::from(index)
            .checked_sub(1)
            .and_then(|i| state.counters.get_mut(i))
        {
            *counter = value;
        }
    }

    // ── Output side ───────────────────────────────────────────────────────────

    /// Values of the last output report.
    pub fn outputs(&self) -> OutputState {
        self.lock().outputs
    }

    /// Payload of every output report, oldest first.
    pub fn output_reports(&self) -> Vec<Vec<u8>> {
        self.lock().output_reports.clone()
    }

    // ── Fault injection ───────────────────────────────────────────────────────

    /// Answer the transfer identified by `key` with `len` bytes.
    pub fn override_reply_len(&self, key: TransferKey, len: u16) {
        self.lock().reply_len_overrides.insert(key, len);
    }

    /// Make every transfer matching `key` fail.
    pub fn fail_transfer(&self, key: TransferKey) {
        self.lock().failing.insert(key);
    }

    /// Make every transfer fail, as if the cable had been pulled.
    pub fn fail_all_transfers(&self, fail: bool) {
        self.lock().fail_all = fail;
    }

    /// Keep the toggle bit unchanged on input reads.
    pub fn stall_toggle(&self, stall: bool) {
        self.lock().stall_toggle = stall;
    }

    /// Hide the board from openers.
    pub fn set_unplugged(&self, unplugged: bool) {
        self.lock().unplugged = unplugged;
    }

    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.stall_toggle = false;
        state.fail_all = false;
        state.failing.clear();
        state.reply_len_overrides.clear();
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.lock().transfers.clone()
    }

    /// Number of recorded transfers matching `key`.
    pub fn transfer_count(&self, key: TransferKey) -> usize {
        self.lock().transfers.iter().filter(|t| t.key == key).count()
    }

    pub fn clear_transfers(&self) {
        self.lock().transfers.clear();
    }

    pub fn is_configured(&self) -> bool {
        self.lock().configured
    }

    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }
}

impl Opener for SimulatedBoard {
    type Transport = SimTransport;

    fn open(&self, name: &str) -> TransportResult<SimTransport> {
        let selector: DeviceSelector = name.parse()?;
        let mut state = self.lock();
        let matches = selector.vendor_id() == VENDOR_ID
            && product_id_for_card(state.card) == Some(selector.product_id());
        if state.unplugged || !matches {
            return Err(TransportError::NotFound(name.to_string()));
        }
        state.open_handles += 1;
        state.configured = false;
        debug!(device = name, card = state.card, "opened simulated board");
        Ok(SimTransport {
            state: Arc::clone(&self.state),
            name: name.to_string(),
            closed: false,
        })
    }
}

/// Transport connected to a [`SimulatedBoard`].
#[derive(Debug)]
pub struct SimTransport {
    state: Arc<Mutex<SimState>>,
    name: String,
    closed: bool,
}

impl SimTransport {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.open_handles = state.open_handles.saturating_sub(1);
        }
    }
}

impl Transport for SimTransport {
    fn transfer(&mut self, packet: &mut [u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let request = packet.to_vec();
        let key = classify(packet).map(|kind| TransferKey::of(&kind));
        let result = state.execute(packet);
        trace!(device = %self.name, packet = %packet::hex_dump(packet), ok = result.is_ok(), "simulated transfer");
        if let Some(key) = key {
            state.transfers.push(TransferRecord {
                key,
                request,
                reply_len: result.as_ref().ok().copied(),
            });
        }
        result.map(|_| ())
    }

    fn close(mut self) -> TransportResult<()> {
        self.release();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SimTransport {
    fn drop(&mut self) {
        self.release();
    }
}
