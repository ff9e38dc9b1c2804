//! Runtime statistics for the handshake loop

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the controller as cycles finish
#[derive(Debug, Default)]
pub struct HandshakeStats {
    /// Cycles that ended with an ack
    pub cycles_completed: AtomicU64,
    /// Cycles abandoned before execution (unreadable or malformed command)
    pub commands_abandoned: AtomicU64,
    /// Command artifacts whose first line did not parse
    pub malformed_commands: AtomicU64,
    /// Executor failures
    pub execution_failures: AtomicU64,
    /// Commands executed whose ack signal could not be asserted
    pub ack_failures: AtomicU64,
    /// Shared-log lines that could not be written
    pub log_write_failures: AtomicU64,
    last_ack_at: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`HandshakeStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeStatsSnapshot {
    pub cycles_completed: u64,
    pub commands_abandoned: u64,
    pub malformed_commands: u64,
    pub execution_failures: u64,
    pub ack_failures: u64,
    pub log_write_failures: u64,
    pub last_ack_at: Option<DateTime<Utc>>,
}

impl HandshakeStats {
    pub(crate) fn record_ack(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        *self.last_ack_at.lock() = Some(Utc::now());
    }

    pub(crate) fn record_abandoned(&self) {
        self.commands_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_execution_failure(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ack_failure(&self) {
        self.ack_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_log_write_failure(&self) {
        self.log_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_ack_at(&self) -> Option<DateTime<Utc>> {
        *self.last_ack_at.lock()
    }

    pub fn snapshot(&self) -> HandshakeStatsSnapshot {
        HandshakeStatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            commands_abandoned: self.commands_abandoned.load(Ordering::Relaxed),
            malformed_commands: self.malformed_commands.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            ack_failures: self.ack_failures.load(Ordering::Relaxed),
            log_write_failures: self.log_write_failures.load(Ordering::Relaxed),
            last_ack_at: self.last_ack_at(),
        }
    }
}
