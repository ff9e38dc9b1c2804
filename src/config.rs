//! # Motor Controller Configuration
//!
//! Every path and interval the handshake uses lives here instead of in
//! global constants. Values are layered: built-in defaults, then an optional
//! TOML file, then `MOTOR_CTRL_*` environment overrides.
//!
//! ```rust,no_run
//! use motor_ctrl::config::MotorCtrlConfig;
//!
//! # fn main() -> motor_ctrl::Result<()> {
//! let config = MotorCtrlConfig::load(None)?;
//! println!("polling every {:?}", config.poll_interval());
//! # Ok(())
//! # }
//! ```

use crate::constants::{paths, process, timing, ENV_PREFIX};
use crate::error::{MotorCtrlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// What to do with a command artifact whose first line does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedCommandPolicy {
    /// Log the problem and abandon the cycle without an ack
    #[default]
    Abandon,
    /// Log a warning and execute `malformed_sentinel_id` instead
    ExecuteSentinel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorCtrlConfig {
    pub command_file_path: PathBuf,
    pub ready_flag_path: PathBuf,
    pub ack_flag_path: PathBuf,
    pub log_file_path: PathBuf,
    pub lock_file_path: PathBuf,
    /// Tag written as `[<tag>]` in front of every shared-log line
    pub process_tag: String,
    /// Name of the producer, used in the `Received motor command from ...` line
    pub upstream_name: String,
    pub poll_interval_ms: u64,
    pub lock_poll_interval_ms: u64,
    pub execution_delay_ms: u64,
    pub post_ack_delay_ms: u64,
    /// 0 waits for the lock forever
    pub lock_timeout_ms: u64,
    /// 0 never breaks an orphaned lock marker. Otherwise at least
    /// 1000 and longer than any sibling ever holds the lock
    pub stale_lock_after_ms: u64,
    pub malformed_command_policy: MalformedCommandPolicy,
    pub malformed_sentinel_id: i64,
    /// Stop the loop when the shared log cannot be written
    pub fail_on_log_error: bool,
    pub log_timestamps: bool,
}

impl Default for MotorCtrlConfig {
    fn default() -> Self {
        Self {
            command_file_path: PathBuf::from(paths::COMMAND_FILE),
            ready_flag_path: PathBuf::from(paths::READY_FLAG),
            ack_flag_path: PathBuf::from(paths::ACK_FLAG),
            log_file_path: PathBuf::from(paths::SYSTEM_LOG),
            lock_file_path: PathBuf::from(paths::LOG_LOCK),
            process_tag: process::TAG.to_string(),
            upstream_name: process::UPSTREAM_NAME.to_string(),
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            lock_poll_interval_ms: timing::LOCK_POLL_INTERVAL_MS,
            execution_delay_ms: timing::EXECUTION_DELAY_MS,
            post_ack_delay_ms: timing::POST_ACK_DELAY_MS,
            lock_timeout_ms: timing::LOCK_TIMEOUT_MS,
            stale_lock_after_ms: timing::STALE_LOCK_AFTER_MS,
            malformed_command_policy: MalformedCommandPolicy::default(),
            malformed_sentinel_id: 0,
            fail_on_log_error: false,
            log_timestamps: false,
        }
    }
}

impl MotorCtrlConfig {
    /// Load configuration from defaults, an optional TOML file and the
    /// process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_overrides(file, None)
    }

    /// Same as [`load`](Self::load), but reads overrides from `overrides`
    /// instead of the process environment. Keys keep the `MOTOR_CTRL_` prefix.
    pub fn load_with_overrides(
        file: Option<&Path>,
        overrides: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            debug!(path = %path.display(), "Loading motor controller configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(overrides),
        );

        let config: MotorCtrlConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(MotorCtrlError::Configuration(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.lock_poll_interval_ms == 0 {
            return Err(MotorCtrlError::Configuration(
                "lock_poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.process_tag.is_empty() {
            return Err(MotorCtrlError::Configuration(
                "process_tag must not be empty".to_string(),
            ));
        }

        if self
            .process_tag
            .chars()
            .any(|c| c == ']' || c == '\n' || c == '\r')
        {
            return Err(MotorCtrlError::Configuration(format!(
                "process_tag {:?} may not contain ']' or line breaks",
                self.process_tag
            )));
        }

        if self.upstream_name.contains(['\n', '\r']) {
            return Err(MotorCtrlError::Configuration(format!(
                "upstream_name {:?} may not contain line breaks",
                self.upstream_name
            )));
        }

        if self.stale_lock_after_ms > 0
            && self.stale_lock_after_ms < timing::MIN_STALE_LOCK_AFTER_MS
        {
            return Err(MotorCtrlError::Configuration(format!(
                "stale_lock_after_ms must be 0 or at least {}, got {}",
                timing::MIN_STALE_LOCK_AFTER_MS,
                self.stale_lock_after_ms
            )));
        }

        let artifacts = [
            ("command_file_path", &self.command_file_path),
            ("ready_flag_path", &self.ready_flag_path),
            ("ack_flag_path", &self.ack_flag_path),
            ("log_file_path", &self.log_file_path),
            ("lock_file_path", &self.lock_file_path),
        ];
        for (i, (name, path)) in artifacts.iter().enumerate() {
            if path.as_os_str().is_empty() {
                return Err(MotorCtrlError::Configuration(format!(
                    "{name} must not be empty"
                )));
            }
            if let Some((other, _)) = artifacts[i + 1..].iter().find(|(_, p)| p == path) {
                return Err(MotorCtrlError::Configuration(format!(
                    "{name} and {other} both point at {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Configuration rooted in `dir`: every artifact keeps its default file
    /// name but lives under the given directory
    pub fn in_directory(dir: &Path) -> Self {
        Self {
            command_file_path: dir.join(paths::COMMAND_FILE),
            ready_flag_path: dir.join(paths::READY_FLAG),
            ack_flag_path: dir.join(paths::ACK_FLAG),
            log_file_path: dir.join(paths::SYSTEM_LOG),
            lock_file_path: dir.join(paths::LOG_LOCK),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    pub fn execution_delay(&self) -> Duration {
        Duration::from_millis(self.execution_delay_ms)
    }

    pub fn post_ack_delay(&self) -> Duration {
        Duration::from_millis(self.post_ack_delay_ms)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        (self.lock_timeout_ms > 0).then(|| Duration::from_millis(self.lock_timeout_ms))
    }

    pub fn stale_lock_after(&self) -> Option<Duration> {
        (self.stale_lock_after_ms > 0).then(|| Duration::from_millis(self.stale_lock_after_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_process() {
        let config = MotorCtrlConfig::default();
        assert_eq!(config.command_file_path, PathBuf::from("motor_cmd.txt"));
        assert_eq!(config.ready_flag_path, PathBuf::from("cmd_ready.flag"));
        assert_eq!(config.ack_flag_path, PathBuf::from("cmd_ack.flag"));
        assert_eq!(config.log_file_path, PathBuf::from("system_log.txt"));
        assert_eq!(config.lock_file_path, PathBuf::from("log.lock"));
        assert_eq!(config.process_tag, "C");
        assert_eq!(config.upstream_name, "B");
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.lock_poll_interval(), Duration::from_millis(10));
        assert_eq!(config.post_ack_delay(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_disables_optional_timeouts() {
        let config = MotorCtrlConfig {
            lock_timeout_ms: 0,
            stale_lock_after_ms: 0,
            ..MotorCtrlConfig::default()
        };
        assert_eq!(config.lock_timeout(), None);
        assert_eq!(config.stale_lock_after(), None);

        let config = MotorCtrlConfig {
            stale_lock_after_ms: 30_000,
            ..MotorCtrlConfig::default()
        };
        assert_eq!(config.stale_lock_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_validation_rejects_zero_poll_interval() {
        let config = MotorCtrlConfig {
            poll_interval_ms: 0,
            ..MotorCtrlConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MotorCtrlError::Configuration(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_tag() {
        for tag in ["", "C]", "C\nD"] {
            let config = MotorCtrlConfig {
                process_tag: tag.to_string(),
                ..MotorCtrlConfig::default()
            };
            assert!(config.validate().is_err(), "tag {tag:?} should be rejected");
        }
    }

    #[test]
    fn test_validation_rejects_short_stale_threshold() {
        let config = MotorCtrlConfig {
            stale_lock_after_ms: 50,
            ..MotorCtrlConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stale_lock_after_ms"));

        let config = MotorCtrlConfig {
            stale_lock_after_ms: 1_000,
            ..MotorCtrlConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_shared_paths() {
        let config = MotorCtrlConfig {
            ack_flag_path: PathBuf::from("cmd_ready.flag"),
            ..MotorCtrlConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ready_flag_path and ack_flag_path"));
    }

    #[test]
    fn test_in_directory_keeps_file_names() {
        let config = MotorCtrlConfig::in_directory(Path::new("/run/motor"));
        assert_eq!(config.lock_file_path, PathBuf::from("/run/motor/log.lock"));
        assert_eq!(config.poll_interval_ms, 100);
    }
}
