//! Runs the descriptor bootstrap sequence against a transport.

use k8055_protocol::packet::hex_dump;
use k8055_protocol::{
    BootstrapStep, ErrorKinds, GetDataBuffer, K8055Error, K8055Result, SETTLE_DELAY,
};
use k8055_transport::{Sleeper, Transport};
use tracing::{debug, warn};

/// Knobs for the bootstrap sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Issue step 7 (class request 21h/0Ah). Off by default: its reply length
    /// check cannot pass, so enabling it always reports `BUFFER | INIT`.
    pub vendor_request_21h: bool,
}

impl BootstrapOptions {
    pub fn is_enabled(&self, step: BootstrapStep) -> bool {
        step.enabled_by_default()
            || (step == BootstrapStep::VendorRequest21h && self.vendor_request_21h)
    }
}

/// Result of one bootstrap step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: BootstrapStep,
    /// `false` for a step skipped by [`BootstrapOptions`].
    pub executed: bool,
    pub transfer_ok: bool,
    /// Length field after the transfer. Holds the requested length if the
    /// transfer failed before the transport wrote a reply.
    pub reply_len: u16,
    pub errors: ErrorKinds,
}

impl StepOutcome {
    fn skipped(step: BootstrapStep) -> Self {
        Self {
            step,
            executed: false,
            transfer_ok: true,
            reply_len: 0,
            errors: ErrorKinds::empty(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Per-step results of one bootstrap run, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    steps: Vec<StepOutcome>,
}

impl BootstrapReport {
    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    pub fn outcome(&self, step: BootstrapStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|o| o.step == step)
    }

    /// Overall error set: every step error plus `INIT` if there was any.
    pub fn errors(&self) -> ErrorKinds {
        let steps = self
            .steps
            .iter()
            .fold(ErrorKinds::empty(), |acc, o| acc | o.errors);
        if steps.is_empty() {
            steps
        } else {
            steps | ErrorKinds::INIT
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors().is_empty()
    }

    /// # Errors
    ///
    /// The overall error set if any step failed.
    pub fn into_result(self) -> K8055Result<Self> {
        match self.errors() {
            e if e.is_empty() => Ok(self),
            e => Err(K8055Error::new(e)),
        }
    }
}

/// Execute every enabled step in order. Never aborts early.
///
/// The initial interrupt read (step 9) goes through `get`, so the toggle bit
/// it leaves behind is the baseline for the first data read.
pub fn run_bootstrap<T: Transport, S: Sleeper>(
    transport: &mut T,
    sleeper: &mut S,
    options: &BootstrapOptions,
    get: &mut GetDataBuffer,
) -> BootstrapReport {
    let mut steps = Vec::with_capacity(BootstrapStep::ALL.len());

    for step in BootstrapStep::ALL {
        if !options.is_enabled(step) {
            debug!(%step, "skipped");
            steps.push(StepOutcome::skipped(step));
            continue;
        }

        let (result, reply_len, dump) = if step == BootstrapStep::InitialRead {
            sleeper.sleep(SETTLE_DELAY);
            get.rearm(step.setup().length);
            let result = transport.transfer(get.as_mut_bytes());
            (result, get.reply_len(), hex_dump(get.as_bytes()))
        } else {
            let mut packet = step.packet();
            let result = transport.transfer(packet.as_mut_bytes());
            (result, packet.reply_len(), packet.hex_dump())
        };

        let mut errors = ErrorKinds::empty();
        let transfer_ok = match result {
            Ok(()) => true,
            Err(e) => {
                warn!(%step, error = %e, "bootstrap transfer failed");
                errors |= ErrorKinds::FROM_CALL;
                false
            }
        };
        if reply_len != step.expected_reply_len() {
            warn!(
                %step,
                reply_len,
                expected = step.expected_reply_len(),
                "unexpected reply length"
            );
            errors |= ErrorKinds::BUFFER;
        }
        debug!(%step, reply_len, packet = %dump, "done");

        sleeper.sleep(step.delay_after());
        steps.push(StepOutcome {
            step,
            executed: true,
            transfer_ok,
            reply_len,
            errors,
        });
    }

    BootstrapReport { steps }
}
