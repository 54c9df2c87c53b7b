// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn allow_all_commands_accepts_truthy_spellings() {
    for value in ["1", "true", "YES"] {
        std::env::set_var("TELEPORTATION_DAEMON_ALLOW_ALL_COMMANDS", value);
        assert!(allow_all_commands(), "value {value:?} should be truthy");
    }
    std::env::set_var("TELEPORTATION_DAEMON_ALLOW_ALL_COMMANDS", "0");
    assert!(!allow_all_commands());
    std::env::remove_var("TELEPORTATION_DAEMON_ALLOW_ALL_COMMANDS");
    assert!(!allow_all_commands());
}

#[test]
#[serial]
fn danger_zone_requires_exact_phrase() {
    std::env::set_var("TELEPORTATION_DANGER_ZONE", "yes");
    assert!(!danger_zone_confirmed());
    std::env::set_var("TELEPORTATION_DANGER_ZONE", "i_understand_the_risks");
    assert!(danger_zone_confirmed());
    std::env::remove_var("TELEPORTATION_DANGER_ZONE");
    assert!(!danger_zone_confirmed());
}

#[test]
#[serial]
fn production_flag_is_case_insensitive() {
    std::env::set_var("TELEPORTATION_ENV", "Production");
    assert!(is_production());
    std::env::set_var("TELEPORTATION_ENV", "dev");
    assert!(!is_production());
    std::env::remove_var("TELEPORTATION_ENV");
    assert!(!is_production());
}

#[test]
#[serial]
fn assistant_bin_defaults_to_claude() {
    std::env::remove_var("TELEPORTATION_ASSISTANT_BIN");
    assert_eq!(assistant_bin(), "claude");
    std::env::set_var("TELEPORTATION_ASSISTANT_BIN", "/opt/claude");
    assert_eq!(assistant_bin(), "/opt/claude");
    std::env::remove_var("TELEPORTATION_ASSISTANT_BIN");
}
