//! # System Constants
//!
//! Default artifact locations, timing values and the fixed texts this
//! process writes to the shared log. Everything here can be overridden
//! through [`crate::config::MotorCtrlConfig`] except the message texts.

/// Default locations of the five filesystem artifacts, relative to the
/// working directory the sibling processes share
pub mod paths {
    pub const COMMAND_FILE: &str = "motor_cmd.txt";
    pub const READY_FLAG: &str = "cmd_ready.flag";
    pub const ACK_FLAG: &str = "cmd_ack.flag";
    pub const SYSTEM_LOG: &str = "system_log.txt";
    pub const LOG_LOCK: &str = "log.lock";
}

/// Default timing values in milliseconds
pub mod timing {
    pub const POLL_INTERVAL_MS: u64 = 100;
    pub const LOCK_POLL_INTERVAL_MS: u64 = 10;
    pub const EXECUTION_DELAY_MS: u64 = 500;
    pub const POST_ACK_DELAY_MS: u64 = 100;
    /// 0 disables the timeout and waits forever
    pub const LOCK_TIMEOUT_MS: u64 = 5_000;
    /// 0 disables stale-lock recovery
    pub const STALE_LOCK_AFTER_MS: u64 = 0;
    /// Smallest accepted stale threshold; it must outlast every legitimate hold
    pub const MIN_STALE_LOCK_AFTER_MS: u64 = 1_000;
}

/// Default identity of this process among the siblings sharing the log
pub mod process {
    pub const TAG: &str = "C";
    pub const UPSTREAM_NAME: &str = "B";
}

/// Prefix for every environment override, e.g. `MOTOR_CTRL_POLL_INTERVAL_MS`
pub const ENV_PREFIX: &str = "MOTOR_CTRL";

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_PATH_ENV: &str = "MOTOR_CTRL_CONFIG";

/// Texts written to the shared log
pub mod messages {
    pub fn started(tag: &str) -> String {
        format!("Process {tag} started.")
    }

    pub fn received(upstream: &str) -> String {
        format!("Received motor command from {upstream}.")
    }

    pub fn executed(command_id: i64) -> String {
        format!("Motor command {command_id} executed successfully.")
    }

    pub fn unreadable(command_file: &str) -> String {
        format!("ERROR: Could not open {command_file}")
    }

    pub fn malformed(reason: &str) -> String {
        format!("ERROR: Malformed motor command: {reason}")
    }

    pub fn malformed_sentinel(sentinel_id: i64) -> String {
        format!("WARNING: Malformed motor command, executing sentinel id {sentinel_id}")
    }

    pub fn execution_failed(command_id: i64, reason: &str) -> String {
        format!("ERROR: Motor command {command_id} failed: {reason}")
    }

    pub fn ack_failed(command_id: i64, reason: &str) -> String {
        format!("ERROR: Motor command {command_id} executed but ack could not be sent: {reason}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_message_carries_id_and_success() {
        let line = messages::executed(42);
        assert!(line.contains("42"));
        assert!(line.contains("successfully"));
    }

    #[test]
    fn test_reference_texts() {
        assert_eq!(messages::started(process::TAG), "Process C started.");
        assert_eq!(
            messages::received(process::UPSTREAM_NAME),
            "Received motor command from B."
        );
        assert_eq!(messages::started("MOTOR"), "Process MOTOR started.");
        assert_eq!(
            messages::unreadable(paths::COMMAND_FILE),
            "ERROR: Could not open motor_cmd.txt"
        );
    }
}
