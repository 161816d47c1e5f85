//! Integration tests for the k8055e console demo, run against the simulated board.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn k8055e() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("k8055e")?;
    cmd.env_remove("K8055_DEVICE").env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn test_help_flags() -> TestResult {
    for flag in ["-h", "-?", "--help"] {
        k8055e()?
            .arg(flag)
            .assert()
            .success()
            .stdout(predicate::str::contains("Device name"));
    }
    Ok(())
}

#[test]
fn test_no_command_prints_usage_and_disclaimer() -> TestResult {
    k8055e()?
        .assert()
        .success()
        .stdout(predicate::str::contains("VELLEMAN K8055"))
        .stdout(predicate::str::contains("Disclaimer"))
        .stdout(predicate::str::contains("List of options:"))
        .stdout(predicate::str::contains("-d to switch off"));
    Ok(())
}

#[test]
fn test_disclaimer_switched_off() -> TestResult {
    k8055e()?
        .args(["-d", "-i"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Disclaimer").not())
        .stdout(predicate::str::contains("Version: "))
        .stdout(predicate::str::contains("List of options:").not());
    Ok(())
}

#[test]
fn test_info_command_with_preface() -> TestResult {
    k8055e()?
        .args(["-d", "-p", "-n", "K8055_1", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'info_string'"))
        .stdout(predicate::str::contains("USB Device Name: 'K8055_1'"))
        .stdout(predicate::str::contains("6 Name: k8055dd"));
    Ok(())
}

#[test]
fn test_simulated_read() -> TestResult {
    k8055e()?
        .args([
            "-d",
            "--simulate",
            "read",
            "--tables",
            "1",
            "--lines",
            "2",
            "--interval-ms",
            "0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing table 1 / 1"))
        .stdout(predicate::str::contains("0x11,   0x05    ( 0b00101 )      128    064"))
        .stdout(predicate::str::contains("Impulses counted on I1 =       3"))
        .stdout(predicate::str::contains("Device '$' closed."));
    Ok(())
}

#[test]
fn test_simulated_write() -> TestResult {
    k8055e()?
        .args(["-d", "--simulate", "-n", "2", "write", "--step-delay-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DAC2=255-DAC1"))
        .stdout(predicate::str::contains(" FD FE FF"))
        .stdout(predicate::str::contains("Device '2' closed."));
    Ok(())
}

#[test]
fn test_unknown_device_name_fails() -> TestResult {
    k8055e()?
        .args(["-d", "--simulate", "-n", "KDEV01", "read", "--interval-ms", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot open device 'KDEV01'"));
    Ok(())
}

#[test]
fn test_device_name_from_environment() -> TestResult {
    k8055e()?
        .env("K8055_DEVICE", "K8055_3")
        .args(["-d", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("USB Device Name: 'K8055_3'"));
    Ok(())
}

#[test]
fn test_config_file_sets_device_and_timing() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("k8055.yaml");
    fs::write(
        &path,
        "device: \"1\"\ndemo:\n  tables: 1\n  lines_per_table: 1\n  read_interval_ms: 0\n",
    )?;

    k8055e()?
        .args(["-d", "--simulate", "--config"])
        .arg(&path)
        .arg("read")
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing table 1 / 1"))
        .stdout(predicate::str::contains("Device '1' closed."));
    Ok(())
}

#[test]
fn test_invalid_config_file_fails() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "usb_timeout_ms: 0\n")?;

    k8055e()?
        .args(["-d", "--config"])
        .arg(&path)
        .arg("info")
        .assert()
        .failure()
        .stderr(predicate::str::contains("usb_timeout_ms"));
    Ok(())
}
