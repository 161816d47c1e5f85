//! The device handle: open, bootstrap, exchange data, close.
//!
//! A [`Device`] owns its transport and its own get/put buffers, so handles on
//! different threads never share state. Data exchange is only possible after
//! a successful [`Device::initialize`]; every other call returns `NOT_READY`.

use k8055_protocol::ids::{EP_DATA_IN, EP_DATA_OUT};
use k8055_protocol::report::DATA_PAYLOAD_LEN;
use k8055_protocol::{
    ErrorKinds, GetDataBuffer, InputSnapshot, K8055Error, K8055Result, OutputState, Packet,
    PutDataBuffer,
};
use k8055_transport::{Opener, Sleeper, ThreadSleeper, Transport};
use tracing::{debug, info, warn};

use crate::bootstrap::{BootstrapOptions, BootstrapReport, run_bootstrap};

const FULL_REPORT: u16 = DATA_PAYLOAD_LEN as u16;

/// Lifecycle of an open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Open, bootstrap not yet run.
    Opened,
    /// Bootstrap succeeded; data exchange allowed.
    Ready,
    /// Bootstrap ran and failed. Reopen to retry.
    Failed,
}

pub struct Device<T: Transport, S: Sleeper = ThreadSleeper> {
    transport: Option<T>,
    sleeper: S,
    state: DeviceState,
    options: BootstrapOptions,
    report: Option<BootstrapReport>,
    get: GetDataBuffer,
    put: PutDataBuffer,
    last_inputs: Option<InputSnapshot>,
    name: String,
}

impl<T: Transport, S: Sleeper> std::fmt::Debug for Device<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("options", &self.options)
            .field("last_inputs", &self.last_inputs)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Device<T, ThreadSleeper> {
    /// Open `name` through `opener`. The device still needs [`Device::initialize`].
    ///
    /// # Errors
    ///
    /// `FROM_CALL` if the opener fails; the cause is logged.
    pub fn open<O>(opener: &O, name: &str) -> K8055Result<Self>
    where
        O: Opener<Transport = T> + ?Sized,
    {
        Self::open_with(opener, name, ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> Device<T, S> {
    /// Like [`Device::open`] with a custom [`Sleeper`].
    ///
    /// # Errors
    ///
    /// `FROM_CALL` if the opener fails; the cause is logged.
    pub fn open_with<O>(opener: &O, name: &str, sleeper: S) -> K8055Result<Self>
    where
        O: Opener<Transport = T> + ?Sized,
    {
        match opener.open(name) {
            Ok(transport) => {
                info!(device = name, "device opened");
                Ok(Self::from_transport(transport, sleeper))
            }
            Err(e) => {
                warn!(device = name, error = %e, "open failed");
                Err(K8055Error::from_call())
            }
        }
    }

    /// Wrap an already open transport.
    pub fn from_transport(transport: T, sleeper: S) -> Self {
        let name = transport.name().to_string();
        Self {
            transport: Some(transport),
            sleeper,
            state: DeviceState::Opened,
            options: BootstrapOptions::default(),
            report: None,
            get: GetDataBuffer::new(),
            put: PutDataBuffer::new(),
            last_inputs: None,
            name,
        }
    }

    pub fn with_options(mut self, options: BootstrapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::Ready
    }

    /// Report of the bootstrap run, if [`Device::initialize`] was called.
    pub fn bootstrap_report(&self) -> Option<&BootstrapReport> {
        self.report.as_ref()
    }

    /// Run the bootstrap sequence. Allowed once per open handle.
    ///
    /// # Errors
    ///
    /// `NOT_READY` if bootstrap already ran on this handle, otherwise the
    /// overall bootstrap error set (always containing `INIT`). The full
    /// report stays available through [`Device::bootstrap_report`].
    pub fn initialize(&mut self) -> K8055Result<BootstrapReport> {
        if self.state != DeviceState::Opened {
            return Err(K8055Error::not_ready());
        }
        let transport = self.transport.as_mut().ok_or_else(K8055Error::not_ready)?;
        let report = run_bootstrap(transport, &mut self.sleeper, &self.options, &mut self.get);
        self.get.rearm(FULL_REPORT);
        self.report = Some(report.clone());

        let errors = report.errors();
        if errors.is_empty() {
            self.state = DeviceState::Ready;
            info!(device = %self.name, "bootstrap complete");
            Ok(report)
        } else {
            self.state = DeviceState::Failed;
            warn!(device = %self.name, %errors, "bootstrap failed");
            Err(K8055Error::new(errors))
        }
    }

    fn ready(state: DeviceState, transport: &mut Option<T>) -> K8055Result<&mut T> {
        match (state, transport) {
            (DeviceState::Ready, Some(transport)) => Ok(transport),
            _ => Err(K8055Error::not_ready()),
        }
    }

    /// Read the input report and check its freshness.
    ///
    /// # Errors
    ///
    /// - `FROM_CALL` if the transfer failed.
    /// - `TOGGLE_BIT` if the toggle bit did not change; the cached snapshot
    ///   is left as it was.
    /// - `BYTE_NUMBER` if the reply was not 8 bytes. A fresh snapshot is
    ///   still cached in that case, see [`Device::last_inputs`].
    pub fn read_all_inputs(&mut self) -> K8055Result<InputSnapshot> {
        let transport = Self::ready(self.state, &mut self.transport)?;
        let before = self.get.toggle_bit();
        self.get.rearm(FULL_REPORT);
        if let Err(e) = transport.transfer(self.get.as_mut_bytes()) {
            warn!(device = %self.name, error = %e, "input read failed");
            return Err(K8055Error::from_call());
        }

        let mut errors = ErrorKinds::empty();
        if self.get.reply_len() != FULL_REPORT {
            errors |= ErrorKinds::BYTE_NUMBER;
        }
        let snapshot = self.get.snapshot();
        if self.get.toggle_bit() == before {
            warn!(device = %self.name, "stale input report");
            errors |= ErrorKinds::TOGGLE_BIT;
        } else {
            self.last_inputs = Some(snapshot);
        }
        debug!(device = %self.name, ?snapshot, %errors, "inputs read");
        errors.into_result().map(|()| snapshot)
    }

    /// Snapshot of the last fresh read.
    pub fn last_inputs(&self) -> Option<InputSnapshot> {
        self.last_inputs
    }

    /// Counter 1 or 2 from the last input report.
    ///
    /// # Errors
    ///
    /// - `NOT_READY` unless the device is [`DeviceState::Ready`].
    /// - `RANGE` for any other index.
    pub fn check_counter(&self, index: u8) -> K8055Result<u16> {
        if self.state != DeviceState::Ready {
            return Err(K8055Error::not_ready());
        }
        self.get.counter(index)
    }

    /// Stage the digital outputs for the next commit.
    ///
    /// # Errors
    ///
    /// `RANGE` if `value` exceeds 255; nothing is staged.
    pub fn prepare_digital_out(&mut self, value: u32) -> K8055Result<()> {
        self.put.set_digital(value)
    }

    /// Stage DAC channel 1 or 2 for the next commit.
    ///
    /// # Errors
    ///
    /// `RANGE` if `value` exceeds 255 or `channel` is not 1 or 2; nothing is staged.
    pub fn prepare_analog_out(&mut self, value: u32, channel: u8) -> K8055Result<()> {
        self.put.set_analog(value, channel)
    }

    /// Values the next commit will send.
    pub fn pending_outputs(&self) -> OutputState {
        self.put.output_state()
    }

    /// Send the staged outputs.
    ///
    /// # Errors
    ///
    /// `NOT_READY` before a successful bootstrap, `FROM_CALL` if the transfer failed.
    pub fn commit_outputs(&mut self) -> K8055Result<()> {
        self.put.rearm(FULL_REPORT);
        let outputs = self.put.output_state();
        let transport = Self::ready(self.state, &mut self.transport)?;
        if let Err(e) = transport.transfer(self.put.as_mut_bytes()) {
            warn!(device = %self.name, error = %e, "output write failed");
            return Err(K8055Error::from_call());
        }
        debug!(device = %self.name, ?outputs, "outputs written");
        Ok(())
    }

    /// Stage all outputs at once and send them.
    ///
    /// # Errors
    ///
    /// As [`Device::commit_outputs`].
    pub fn write_outputs(&mut self, outputs: OutputState) -> K8055Result<()> {
        self.put.apply(outputs);
        self.commit_outputs()
    }

    /// Read `count` (at most 8) raw bytes from the input endpoint.
    ///
    /// The returned vector holds as many bytes as the board sent. No
    /// freshness check is made.
    ///
    /// # Errors
    ///
    /// `BUFFER` if `count` exceeds 8 (checked before any transfer),
    /// `NOT_READY`, or `FROM_CALL`.
    pub fn read_raw(&mut self, count: usize) -> K8055Result<Vec<u8>> {
        let len = u16::try_from(count)
            .ok()
            .filter(|n| *n <= FULL_REPORT)
            .ok_or_else(K8055Error::buffer)?;
        let transport = Self::ready(self.state, &mut self.transport)?;
        self.get.rearm(len);
        let result = transport.transfer(self.get.as_mut_bytes());
        let received = usize::from(self.get.reply_len().min(len));
        self.get.rearm(FULL_REPORT);
        if let Err(e) = result {
            warn!(device = %self.name, endpoint = EP_DATA_IN, error = %e, "raw read failed");
            return Err(K8055Error::from_call());
        }
        Ok(self.get.payload().iter().take(received).copied().collect())
    }

    /// Write up to 8 raw bytes to the output endpoint. Staged outputs are
    /// not affected.
    ///
    /// # Errors
    ///
    /// `BUFFER` if `data` is longer than 8 bytes (checked before any
    /// transfer), `NOT_READY`, or `FROM_CALL`.
    pub fn write_raw(&mut self, data: &[u8]) -> K8055Result<usize> {
        let len = u16::try_from(data.len())
            .ok()
            .filter(|n| *n <= FULL_REPORT)
            .ok_or_else(K8055Error::buffer)?;
        let mut packet = Packet::interrupt(EP_DATA_OUT, len);
        packet.payload_mut().copy_from_slice(data);
        let transport = Self::ready(self.state, &mut self.transport)?;
        if let Err(e) = transport.transfer(packet.as_mut_bytes()) {
            warn!(device = %self.name, endpoint = EP_DATA_OUT, error = %e, "raw write failed");
            return Err(K8055Error::from_call());
        }
        Ok(usize::from(packet.reply_len()))
    }

    /// Release the device.
    ///
    /// # Errors
    ///
    /// `FROM_CALL` if the transport could not be released; the cause is logged.
    pub fn close(mut self) -> K8055Result<()> {
        match self.transport.take() {
            Some(transport) => transport.close().map_err(|e| {
                warn!(device = %self.name, error = %e, "close failed");
                K8055Error::from_call()
            }),
            None => Ok(()),
        }
    }
}

impl<T: Transport, S: Sleeper> Drop for Device<T, S> {
    fn drop(&mut self) {
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                debug!(device = %self.name, error = %e, "close on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8055_protocol::BootstrapStep;
    use k8055_transport::{RecordingSleeper, SimTransport, SimulatedBoard, TransferKey};

    type TestDevice = Device<SimTransport, RecordingSleeper>;

    fn bootstrapped(board: &SimulatedBoard) -> K8055Result<TestDevice> {
        let mut device = Device::open_with(board, "$", RecordingSleeper::new())?;
        device.initialize()?;
        Ok(device)
    }

    #[test]
    fn data_calls_before_bootstrap_are_not_ready() -> K8055Result<()> {
        let board = SimulatedBoard::new();
        let mut device: TestDevice = Device::open_with(&board, "$", RecordingSleeper::new())?;
        assert_eq!(device.read_all_inputs(), Err(K8055Error::not_ready()));
        assert_eq!(device.commit_outputs(), Err(K8055Error::not_ready()));
        assert_eq!(device.read_raw(8), Err(K8055Error::not_ready()));
        assert_eq!(device.write_raw(&[1]), Err(K8055Error::not_ready()));
        Ok(())
    }

    #[test]
    fn second_initialize_is_not_ready() -> K8055Result<()> {
        let board = SimulatedBoard::new();
        let mut device = bootstrapped(&board)?;
        assert!(device.is_ready());
        assert_eq!(device.initialize(), Err(K8055Error::not_ready()));
        assert!(device.is_ready());
        Ok(())
    }

    #[test]
    fn prepare_is_allowed_in_any_state() -> K8055Result<()> {
        let board = SimulatedBoard::new();
        let mut device: TestDevice = Device::open_with(&board, "$", RecordingSleeper::new())?;
        device.prepare_digital_out(0x81)?;
        device.prepare_analog_out(100, 2)?;
        assert_eq!(
            device.pending_outputs(),
            OutputState {
                digital: 0x81,
                dac1: 0,
                dac2: 100
            }
        );
        Ok(())
    }

    #[test]
    fn counters_need_a_ready_device() -> K8055Result<()> {
        let board = SimulatedBoard::new();
        board.set_counter(1, 77);
        let device: TestDevice = Device::open_with(&board, "$", RecordingSleeper::new())?;
        assert_eq!(device.check_counter(1), Err(K8055Error::not_ready()));
        assert_eq!(device.check_counter(5), Err(K8055Error::not_ready()));
        Ok(())
    }

    #[test]
    fn counters_after_failed_bootstrap_are_not_ready() -> K8055Result<()> {
        let board = SimulatedBoard::new();
        board.set_counter(1, 77);
        board.override_reply_len(
            TransferKey::for_step(BootstrapStep::ConfigurationDescriptor),
            40,
        );
        let mut device: TestDevice = Device::open_with(&board, "$", RecordingSleeper::new())?;
        assert!(device.initialize().is_err());
        assert_eq!(device.state(), DeviceState::Failed);
        assert_eq!(device.check_counter(1), Err(K8055Error::not_ready()));
        Ok(())
    }

    #[test]
    fn raw_transfers_respect_the_payload_limit() -> K8055Result<()> {
        let board = SimulatedBoard::new();
        let mut device = bootstrapped(&board)?;
        board.clear_transfers();
        assert_eq!(device.read_raw(9), Err(K8055Error::buffer()));
        assert_eq!(device.write_raw(&[0; 9]), Err(K8055Error::buffer()));
        assert!(board.transfers().is_empty());

        board.set_digital_raw(0x20);
        assert_eq!(device.read_raw(1)?, [0x20]);
        assert_eq!(device.write_raw(&[7, 8])?, 2);
        assert_eq!(board.output_reports(), [vec![7, 8]]);
        Ok(())
    }

    #[test]
    fn close_releases_the_transport() -> K8055Result<()> {
        let board = SimulatedBoard::new();
        let device = bootstrapped(&board)?;
        assert_eq!(board.open_handles(), 1);
        device.close()?;
        assert_eq!(board.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn failed_open_is_from_call() {
        let board = SimulatedBoard::new();
        let result: K8055Result<TestDevice> = Device::open_with(&board, "K8055_3", RecordingSleeper::new());
        assert_eq!(result.err(), Some(K8055Error::from_call()));
    }
}
