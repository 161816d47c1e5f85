//! k8055e - console demo for the Velleman K8055 USB interface board
//!
//! Shows the inputs of a board, ramps its outputs and prints information on
//! the driver library. `--simulate` runs every demo against an in-process
//! simulated board.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod demo;
mod error;
mod screens;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use k8055dd::{BoardConfig, Device, DeviceSelector, SimulatedBoard, ThreadSleeper, Transport};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::demo::{ReadSettings, WriteSettings};
use crate::error::CliError;
use crate::screens::Test;

#[derive(Parser, Debug)]
#[command(name = "k8055e")]
#[command(about = "Demo application for the USB interface board Velleman K8055")]
#[command(version, disable_help_flag = true)]
struct Cli {
    /// Disclaimer switched off
    #[arg(short = 'd')]
    no_disclaimer: bool,

    /// Print help (options and parameters)
    #[arg(short = 'h', long = "help", short_alias = '?', action = ArgAction::Help)]
    _help: Option<bool>,

    /// Basic information concerning the device library
    #[arg(short = 'i')]
    info: bool,

    /// Device name: '$', 0..3, K8055_0..K8055_3 or VVVV:PPPP
    #[arg(short = 'n', long = "name", env = "K8055_DEVICE")]
    name: Option<String>,

    /// Preface to every single test, listing the calls it makes
    #[arg(short = 'p')]
    preface: bool,

    /// Use a simulated board instead of USB hardware
    #[arg(long)]
    simulate: bool,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show tables of digital and analog inputs, then both counters
    Read(ReadArgs),

    /// Ramp digital outputs and DAC1 up, DAC2 down
    Write(WriteArgs),

    /// Information on the device library
    Info,

    /// Show the disclaimer
    Disclaimer,
}

#[derive(Args, Debug, Default)]
struct ReadArgs {
    /// Number of tables
    #[arg(long)]
    tables: Option<u32>,

    /// Lines per table
    #[arg(long)]
    lines: Option<u32>,

    /// Milliseconds between two reads
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[derive(Args, Debug, Default)]
struct WriteArgs {
    /// Milliseconds between two output steps
    #[arg(long)]
    step_delay_ms: Option<u64>,
}

enum Demo {
    Read(ReadSettings),
    Write(WriteSettings),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("k8055e={log_level},k8055dd={log_level},k8055_transport={log_level}")
                    .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            screens::print_error_human(&e);
            ExitCode::FAILURE
        }
    }
}

/// Configuration file (or defaults) with the command line applied on top.
fn load_config(cli: &Cli) -> Result<BoardConfig> {
    let mut config = match &cli.config {
        Some(path) => BoardConfig::load(path)
            .map_err(CliError::from)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BoardConfig::default(),
    };
    if let Some(name) = &cli.name {
        config.device = name.clone();
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    screens::banner(&mut out)?;
    if !cli.no_disclaimer {
        screens::disclaimer(&mut out)?;
    }
    if cli.info {
        if cli.preface {
            screens::preface(&mut out, Test::Info)?;
        }
        screens::info(&mut out, &config.device)?;
    }

    let result = match &cli.command {
        Some(Command::Read(args)) => {
            if cli.preface {
                screens::preface(&mut out, Test::Read)?;
            }
            let settings = ReadSettings {
                tables: args.tables.unwrap_or(config.demo.tables),
                lines_per_table: args.lines.unwrap_or(config.demo.lines_per_table),
                interval: args
                    .interval_ms
                    .map_or(config.demo.read_interval(), Duration::from_millis),
            };
            run_on_board(cli, &config, Demo::Read(settings), &mut out)
        }
        Some(Command::Write(args)) => {
            if cli.preface {
                screens::preface(&mut out, Test::Write)?;
            }
            let settings = WriteSettings {
                step_delay: args
                    .step_delay_ms
                    .map_or(config.demo.write_step_delay(), Duration::from_millis),
            };
            run_on_board(cli, &config, Demo::Write(settings), &mut out)
        }
        Some(Command::Info) => {
            if cli.preface && !cli.info {
                screens::preface(&mut out, Test::Info)?;
            }
            if !cli.info {
                screens::info(&mut out, &config.device)?;
            }
            Ok(())
        }
        Some(Command::Disclaimer) => {
            if cli.no_disclaimer {
                screens::disclaimer(&mut out)?;
            }
            Ok(())
        }
        None if cli.info => Ok(()),
        None => Ok(screens::usage(&mut out)?),
    };

    if !cli.no_disclaimer {
        screens::disclaimer_hint(&mut out)?;
    }
    out.flush()?;
    result
}

fn run_on_board(cli: &Cli, config: &BoardConfig, demo: Demo, out: &mut dyn Write) -> Result<()> {
    if cli.simulate {
        let board = simulated_board(config);
        let device = k8055dd::open_simulated(&board, config).map_err(|source| {
            CliError::DeviceOpen {
                name: config.device.clone(),
                source,
            }
        })?;
        return run_demo(device, demo, out);
    }
    run_on_hardware(config, demo, out)
}

#[cfg(feature = "libusb")]
fn run_on_hardware(config: &BoardConfig, demo: Demo, out: &mut dyn Write) -> Result<()> {
    let device = k8055dd::open_usb(config).map_err(|source| CliError::DeviceOpen {
        name: config.device.clone(),
        source,
    })?;
    run_demo(device, demo, out)
}

#[cfg(not(feature = "libusb"))]
fn run_on_hardware(_config: &BoardConfig, _demo: Demo, _out: &mut dyn Write) -> Result<()> {
    Err(CliError::NoBackend.into())
}

/// A board answering to the configured card address, with some inputs set
/// so the read demo has something to show.
fn simulated_board(config: &BoardConfig) -> SimulatedBoard {
    let card = config
        .device
        .parse::<DeviceSelector>()
        .ok()
        .and_then(|selector| selector.card())
        .unwrap_or(0);
    let board = SimulatedBoard::with_card(card);
    board.set_digital_raw(0x11);
    board.set_analog(128, 64);
    board.set_counter(1, 3);
    board.set_counter(2, 7);
    info!(card, "using simulated board");
    board
}

fn run_demo<T: Transport>(
    mut device: Device<T, ThreadSleeper>,
    demo: Demo,
    out: &mut dyn Write,
) -> Result<()> {
    let name = device.name().to_string();
    if let Err(source) = device.initialize() {
        if let Some(report) = device.bootstrap_report() {
            screens::bootstrap_failures(out, report)?;
        }
        return Err(CliError::Bootstrap { name, source }.into());
    }

    let mut pause = ThreadSleeper;
    let result = match demo {
        Demo::Read(settings) => demo::read_demo(&mut device, &mut pause, &settings, out),
        Demo::Write(settings) => demo::write_demo(&mut device, &mut pause, &settings, out),
    };

    match device.close() {
        Ok(()) => writeln!(out, " Device '{name}' closed.")?,
        Err(e) => warn!(device = %name, error = %e, "close failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["k8055e"])?;
        assert!(!cli.no_disclaimer);
        assert!(!cli.simulate);
        assert_eq!(cli.verbose, 0);
        assert!(cli.command.is_none());
        Ok(())
    }

    #[test]
    fn parse_legacy_flags() -> TestResult {
        let cli = Cli::try_parse_from(["k8055e", "-d", "-i", "-p", "-n", "K8055_2", "read"])?;
        assert!(cli.no_disclaimer);
        assert!(cli.info);
        assert!(cli.preface);
        assert_eq!(cli.name.as_deref(), Some("K8055_2"));
        assert!(matches!(cli.command, Some(Command::Read(_))));
        Ok(())
    }

    #[test]
    fn parse_read_overrides() -> TestResult {
        let cli = Cli::try_parse_from([
            "k8055e",
            "read",
            "--tables",
            "1",
            "--lines",
            "2",
            "--interval-ms",
            "0",
        ])?;
        match &cli.command {
            Some(Command::Read(args)) => {
                assert_eq!(args.tables, Some(1));
                assert_eq!(args.lines, Some(2));
                assert_eq!(args.interval_ms, Some(0));
            }
            _ => return Err("expected Read command".into()),
        }
        Ok(())
    }

    #[test]
    fn question_mark_is_help() {
        let result = Cli::try_parse_from(["k8055e", "-?"]);
        assert!(matches!(
            result.map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::DisplayHelp)
        ));
    }

    #[test]
    fn reject_unknown_subcommand() {
        let result = Cli::try_parse_from(["k8055e", "menu"]);
        assert!(result.is_err());
    }

    #[test]
    fn command_line_name_overrides_config() -> TestResult {
        let cli = Cli::try_parse_from(["k8055e", "-n", "3"])?;
        let config = load_config(&cli)?;
        assert_eq!(config.device, "3");
        assert_eq!(simulated_board(&config).card(), 3);
        Ok(())
    }
}
