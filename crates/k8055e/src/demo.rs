//! The read and write demos.
//!
//! Errors from single reads or writes are logged and printed, then the demo
//! carries on. A demo that saw any failure still returns an error at the end
//! so the process exit code reflects it.

use std::io::Write;
use std::time::Duration;

use anyhow::{Result, bail};
use k8055dd::{Device, InputSnapshot, Sleeper, Transport, decode_digital_inputs};
use tracing::{info, warn};

use crate::screens;

/// Values per output line of the write demo.
const WRITE_VALUES_PER_LINE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSettings {
    pub tables: u32,
    pub lines_per_table: u32,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSettings {
    pub step_delay: Duration,
}

/// One table row: raw and decoded digital inputs, then A1 and A2.
pub fn input_line(snapshot: &InputSnapshot) -> String {
    let raw = snapshot.digital_raw;
    let decoded = match decode_digital_inputs(u32::from(raw)) {
        Ok(decoded) => format!("{decoded:#04x}    ( {decoded:#07b} )"),
        Err(e) => format!("{e}"),
    };
    format!(
        "      {raw:#04x},   {decoded}      {:03}    {:03}",
        snapshot.analog1, snapshot.analog2
    )
}

/// Print `tables` tables of input lines, then both counters.
///
/// # Errors
///
/// Output failures, or a summary error if any read failed.
pub fn read_demo<T, S, P>(
    device: &mut Device<T, S>,
    pause: &mut P,
    settings: &ReadSettings,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport,
    S: Sleeper,
    P: Sleeper,
{
    let name = device.name().to_string();
    let mut failures = 0usize;

    for table in 1..=settings.tables {
        pause.sleep(settings.interval);
        screens::read_table_header(out, &name, table, settings.tables)?;
        for _ in 0..settings.lines_per_table {
            match device.read_all_inputs() {
                Ok(snapshot) => writeln!(out, "{}", input_line(&snapshot))?,
                Err(e) => {
                    warn!(device = %name, error = %e, "read failed");
                    failures += 1;
                    writeln!(out, "      read failed: {e}")?;
                }
            }
            pause.sleep(settings.interval);
        }
    }

    for index in 1..=2u8 {
        match device.check_counter(index) {
            Ok(count) => writeln!(out, "  Impulses counted on I{index} =  {count:6}")?,
            Err(e) => {
                failures += 1;
                writeln!(out, "  Counter I{index} unavailable: {e}")?;
            }
        }
    }

    info!(device = %name, failures, "read demo finished");
    if failures > 0 {
        bail!("{failures} read(s) failed");
    }
    Ok(())
}

/// Ramp DO and DAC1 from 0 to 255 with DAC2 = 255 - DAC1.
///
/// # Errors
///
/// Output failures, or a summary error if any write failed.
pub fn write_demo<T, S, P>(
    device: &mut Device<T, S>,
    pause: &mut P,
    settings: &WriteSettings,
    out: &mut dyn Write,
) -> Result<()>
where
    T: Transport,
    S: Sleeper,
    P: Sleeper,
{
    let name = device.name().to_string();
    let step_delay_ms = u64::try_from(settings.step_delay.as_millis()).unwrap_or(u64::MAX);
    screens::write_header(out, &name, step_delay_ms)?;

    let mut failures = 0usize;
    for (position, value) in (0..=u8::MAX).enumerate() {
        pause.sleep(settings.step_delay);

        let staged = device
            .prepare_digital_out(u32::from(value))
            .and_then(|()| device.prepare_analog_out(u32::from(value), 1))
            .and_then(|()| device.prepare_analog_out(u32::from(u8::MAX - value), 2))
            .and_then(|()| device.commit_outputs());
        if let Err(e) = staged {
            warn!(device = %name, value, error = %e, "write failed");
            failures += 1;
        }

        if position > 0 && position % WRITE_VALUES_PER_LINE == 0 {
            writeln!(out)?;
        }
        write!(out, " {value:02X}")?;
    }
    writeln!(out)?;

    info!(device = %name, failures, "write demo finished");
    if failures > 0 {
        writeln!(out, "  {failures} write(s) failed")?;
        bail!("{failures} write(s) failed");
    }
    Ok(())
}
