//! Motor controller error types

use std::path::Path;
use thiserror::Error;

/// Errors raised by the handshake, the shared log and their supporting pieces
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MotorCtrlError {
    #[error("Timed out after {waited_ms}ms waiting for lock marker {path}")]
    LockTimeout { path: String, waited_ms: u64 },

    #[error("Lock marker error at {path}: {reason}")]
    Lock { path: String, reason: String },

    #[error("Could not open command file {path}: {reason}")]
    CommandFileUnreadable { path: String, reason: String },

    #[error("Malformed command payload {line:?}: {reason}")]
    CommandMalformed { line: String, reason: String },

    #[error("Failed to append to shared log {path}: {reason}")]
    LogWriteFailure { path: String, reason: String },

    #[error("Signal marker error at {path}: {reason}")]
    Signal { path: String, reason: String },

    #[error("Command execution failed: {0}")]
    Execution(String),

    #[error("Invalid handshake transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl MotorCtrlError {
    pub fn lock_timeout(path: &Path, waited_ms: u64) -> Self {
        Self::LockTimeout {
            path: path.display().to_string(),
            waited_ms,
        }
    }

    pub fn lock<E: std::fmt::Display>(path: &Path, error: E) -> Self {
        Self::Lock {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    pub fn command_file_unreadable<E: std::fmt::Display>(path: &Path, error: E) -> Self {
        Self::CommandFileUnreadable {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    pub fn command_malformed<L: Into<String>, R: Into<String>>(line: L, reason: R) -> Self {
        Self::CommandMalformed {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn log_write_failure<E: std::fmt::Display>(path: &Path, error: E) -> Self {
        Self::LogWriteFailure {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    pub fn signal<E: std::fmt::Display>(path: &Path, error: E) -> Self {
        Self::Signal {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    /// Whether the main loop may keep polling after this error
    ///
    /// Protocol and resource errors are recovered locally; a broken
    /// configuration or an impossible state transition is a programming
    /// error and should stop the process.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Configuration(_) | Self::InvalidTransition { .. }
        )
    }

    /// Short machine-friendly name used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LockTimeout { .. } => "lock_timeout",
            Self::Lock { .. } => "lock",
            Self::CommandFileUnreadable { .. } => "command_file_unreadable",
            Self::CommandMalformed { .. } => "command_malformed",
            Self::LogWriteFailure { .. } => "log_write_failure",
            Self::Signal { .. } => "signal",
            Self::Execution(_) => "execution",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Configuration(_) => "configuration",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<config::ConfigError> for MotorCtrlError {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

/// Result type alias for MotorCtrlError
pub type Result<T> = std::result::Result<T, MotorCtrlError>;
