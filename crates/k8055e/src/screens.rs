//! Fixed text screens: banner, usage, disclaimer, info and test prefaces.

use std::io::{self, Write};

use anyhow::Error;
use colored::*;
use k8055dd::{BootstrapReport, INFO_ENTRIES, info_string};

const RULE: &str = "  -------------------------------------------------";

/// Which demo a preface or header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    Read,
    Write,
    Info,
}

pub fn banner(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "  +-----------------------------------------------+")?;
    writeln!(out, "  |   This is a Demo Application for the          |")?;
    writeln!(out, "  |   USB-Interface Board VELLEMAN K8055          |")?;
    writeln!(out, "  +-----------------------------------------------+")
}

pub fn usage(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "k8055e [options] [-n <DeviceName>] [command]".bold())?;
    writeln!(out, "    List of options:")?;
    writeln!(out, "-d  Disclaimer switched off.")?;
    writeln!(out, "-h  This screen, options and parameters listed.")?;
    writeln!(out, "-?  The same option as -h.")?;
    writeln!(out, "-n  The following parameter is the Device Name:")?;
    writeln!(out, "    '$' or '0'..'3' or 'K8055_0'..'K8055_3' select a card address,")?;
    writeln!(out, "    'VVVV:PPPP' selects vendor and product id in hex.")?;
    writeln!(out, "    If -n is omitted, '$' (card 0) is used.")?;
    writeln!(out, "-p  Preface to every single test, listing the calls it makes.")?;
    writeln!(out, "-i  Basic information concerning the device library.")?;
    writeln!(out, "-v  More log output (repeatable).")?;
    writeln!(out, "    Commands: read, write, info, disclaimer")
}

pub fn disclaimer(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "   {}", "Disclaimer".bold())?;
    writeln!(out)?;
    writeln!(out, "    This program is a demonstration of the K8055 driver library.")?;
    writeln!(out, "    Anyone who wants to make use of it will have to")?;
    writeln!(out, "    modify it for individual purposes.")?;
    writeln!(out)?;
    writeln!(out, "    The authors are unable to provide any warranty")?;
    writeln!(out, "    concerning any subject covered by this program.")?;
    writeln!(out)?;
    writeln!(out, "                     Authors: K8055DD contributors")
}

pub fn disclaimer_hint(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "    Please use command line option -d to switch off")?;
    writeln!(out, "    the disclaimer.")?;
    writeln!(out, "    Command Line Example: 'k8055e -n <devname> -d read'.")
}

/// Library information, one entry per line.
pub fn info(out: &mut dyn Write, device_name: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  -Info- selected,                 USB Device Name: '{device_name}'")?;
    writeln!(out)?;
    writeln!(out, "   Info on the device library 'k8055dd'")?;
    writeln!(out)?;
    for index in 1..=INFO_ENTRIES {
        match info_string(index) {
            Ok(entry) => writeln!(out, "       {}", entry.trim_end())?,
            Err(e) => writeln!(out, "       {} {e}", "unavailable:".yellow())?,
        }
    }
    Ok(())
}

pub fn preface(out: &mut dyn Write, test: Test) -> io::Result<()> {
    let (title, text, calls): (&str, &[&str], &[&str]) = match test {
        Test::Read => (
            "-Read- selected",
            &[
                "Test -Read- will demonstrate the reading of",
                "the Digital Inputs 'Ix' ( I1, I2, I3, I4, I5 ),",
                "the I1-Counter and the I2-Counter,",
                "the Analog Inputs 'A1' and 'A2' of K8055.",
            ],
            &[
                "Device::open",
                "Device::initialize",
                "Device::read_all_inputs",
                "decode_digital_inputs",
                "Device::check_counter",
                "Device::close",
            ],
        ),
        Test::Write => (
            "-Write- selected",
            &[
                "Test -Write- will demonstrate the writing of",
                "the byte values 0...255",
                "to the Digital Outputs 'Ox' (LEDs LD1...LD8),",
                "to the Analog Output 'DAC1' and",
                "to the Analog Output 'DAC2' of K8055.",
            ],
            &[
                "Device::open",
                "Device::initialize",
                "Device::prepare_digital_out",
                "Device::prepare_analog_out",
                "Device::commit_outputs",
                "Device::close",
            ],
        ),
        Test::Info => (
            "-Info- selected",
            &[
                "Test -Info- will display basic information",
                "concerning the device library 'k8055dd'.",
            ],
            &["info_string"],
        ),
    };

    writeln!(out, "  {}", title.bold())?;
    writeln!(out, "{RULE}")?;
    writeln!(out)?;
    for line in text {
        writeln!(out, "      {line}")?;
    }
    writeln!(out)?;
    writeln!(out, "       Library functions used in this test:")?;
    for call in calls {
        writeln!(out, "       - '{call}'")?;
    }
    Ok(())
}

pub fn read_table_header(
    out: &mut dyn Write,
    device_name: &str,
    table: u32,
    tables: u32,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  Test -Read- selected,            USB Device Name: '{device_name}'")?;
    writeln!(out)?;
    writeln!(out, "   Showing table {table} / {tables}")?;
    writeln!(out)?;
    writeln!(out, "   Digital Inputs                  Analog Inputs")?;
    writeln!(out, "    Ix: raw,  decoded ( binary )   A1:    A2:")?;
    writeln!(out, "{RULE}")
}

pub fn write_header(out: &mut dyn Write, device_name: &str, step_delay_ms: u64) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  Test -Write- selected,           USB Device Name: '{device_name}'")?;
    writeln!(out, "  Time between two I/O actions: app. {step_delay_ms} milliseconds")?;
    writeln!(out)?;
    writeln!(out, " Analog Outputs DAC1, DAC2=255-DAC1 and Digital Outputs Ox, all together")?;
    writeln!(out, "{RULE}")
}

/// Lists every failed bootstrap step.
pub fn bootstrap_failures(out: &mut dyn Write, report: &BootstrapReport) -> io::Result<()> {
    for outcome in report.steps().iter().filter(|o| !o.is_ok()) {
        writeln!(
            out,
            "  {} {} reply {} bytes: {}",
            "failed".red(),
            outcome.step,
            outcome.reply_len,
            outcome.errors
        )?;
    }
    Ok(())
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(
        f: impl FnOnce(&mut dyn Write) -> io::Result<()>,
    ) -> Result<String, Box<dyn std::error::Error>> {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        f(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    #[test]
    fn info_screen_lists_every_entry() -> Result<(), Box<dyn std::error::Error>> {
        let text = render(|out| info(out, "K8055_0"))?;
        assert!(text.contains("USB Device Name: 'K8055_0'"));
        assert!(text.contains("6 Name: k8055dd"));
        assert!(!text.contains("unavailable"));
        Ok(())
    }

    #[test]
    fn read_preface_lists_calls() -> Result<(), Box<dyn std::error::Error>> {
        let text = render(|out| preface(out, Test::Read))?;
        insta::assert_snapshot!(text.lines().skip(8).map(str::trim).collect::<Vec<_>>().join("\n"), @r"
        Library functions used in this test:
        - 'Device::open'
        - 'Device::initialize'
        - 'Device::read_all_inputs'
        - 'decode_digital_inputs'
        - 'Device::check_counter'
        - 'Device::close'
        ");
        Ok(())
    }

    #[test]
    fn table_header_shows_progress() -> Result<(), Box<dyn std::error::Error>> {
        let text = render(|out| read_table_header(out, "$", 2, 5))?;
        assert!(text.contains("Showing table 2 / 5"));
        Ok(())
    }
}
