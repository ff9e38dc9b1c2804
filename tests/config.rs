//! Configuration Module Tests
//!
//! Tests for MotorCtrlConfig layering: defaults, TOML file and
//! `MOTOR_CTRL_*` overrides.

use motor_ctrl::{MalformedCommandPolicy, MotorCtrlConfig, MotorCtrlError};
use std::collections::HashMap;
use std::path::PathBuf;

fn overrides(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn config_loads_defaults_without_sources() {
    let config = MotorCtrlConfig::load_with_overrides(None, overrides(&[])).unwrap();
    assert_eq!(config, MotorCtrlConfig::default());
}

#[test]
fn config_reads_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("motor.toml");
    std::fs::write(
        &path,
        r#"
command_file_path = "/run/pipeline/motor_cmd.txt"
poll_interval_ms = 25
process_tag = "MOTOR"
malformed_command_policy = "execute_sentinel"
malformed_sentinel_id = -1
"#,
    )
    .unwrap();

    let config = MotorCtrlConfig::load_with_overrides(Some(&path), overrides(&[])).unwrap();
    assert_eq!(
        config.command_file_path,
        PathBuf::from("/run/pipeline/motor_cmd.txt")
    );
    assert_eq!(config.poll_interval_ms, 25);
    assert_eq!(config.process_tag, "MOTOR");
    assert_eq!(
        config.malformed_command_policy,
        MalformedCommandPolicy::ExecuteSentinel
    );
    assert_eq!(config.malformed_sentinel_id, -1);
    // Unset keys keep their defaults
    assert_eq!(config.post_ack_delay_ms, 100);
    assert_eq!(config.ack_flag_path, PathBuf::from("cmd_ack.flag"));
}

#[test]
fn config_environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("motor.toml");
    std::fs::write(&path, "poll_interval_ms = 25\nfail_on_log_error = false\n").unwrap();

    let config = MotorCtrlConfig::load_with_overrides(
        Some(&path),
        overrides(&[
            ("MOTOR_CTRL_POLL_INTERVAL_MS", "50"),
            ("MOTOR_CTRL_FAIL_ON_LOG_ERROR", "true"),
            ("MOTOR_CTRL_LOCK_FILE_PATH", "/tmp/shared.lock"),
        ]),
    )
    .unwrap();

    assert_eq!(config.poll_interval_ms, 50);
    assert!(config.fail_on_log_error);
    assert_eq!(config.lock_file_path, PathBuf::from("/tmp/shared.lock"));
}

#[test]
fn config_rejects_invalid_values() {
    let err = MotorCtrlConfig::load_with_overrides(
        None,
        overrides(&[("MOTOR_CTRL_LOCK_POLL_INTERVAL_MS", "0")]),
    )
    .unwrap_err();
    assert!(matches!(err, MotorCtrlError::Configuration(_)));
}

#[test]
fn config_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = MotorCtrlConfig::load_with_overrides(
        Some(&dir.path().join("absent.toml")),
        overrides(&[]),
    )
    .unwrap_err();
    assert!(matches!(err, MotorCtrlError::Configuration(_)));
}
