// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help and version surfaces of the operator binaries.

use crate::prelude::*;

#[test]
fn tp_help_lists_subcommands() {
    let output = assert_cmd::Command::new(binary_path("tp"))
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["status", "doctor", "daemon"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in: {stdout}");
    }
}

#[test]
fn tpd_version_and_help_exit_zero_without_config() {
    let version = assert_cmd::Command::new(binary_path("tpd"))
        .arg("--version")
        .env_clear()
        .output()
        .unwrap();
    assert!(version.status.success());
    assert!(String::from_utf8_lossy(&version.stdout).starts_with("tpd "));

    let help = assert_cmd::Command::new(binary_path("tpd"))
        .arg("--help")
        .env_clear()
        .output()
        .unwrap();
    assert!(help.status.success());
    assert!(String::from_utf8_lossy(&help.stdout).contains("USAGE"));
}

#[test]
fn tpd_rejects_unexpected_arguments() {
    let output = assert_cmd::Command::new(binary_path("tpd"))
        .arg("--bogus")
        .env_clear()
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected argument"));
}
