use serde::{Deserialize, Serialize};

/// Events that drive the handshake state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HandshakeEvent {
    /// Ready signal observed and cleared
    ReadyDetected,
    /// Command artifact parsed (or replaced by the sentinel id)
    CommandAccepted(i64),
    /// Cycle abandoned before execution, with the reason
    CommandAbandoned(String),
    /// Executor reported success
    ExecutionSucceeded,
    /// Executor reported failure; no ack will be sent
    ExecutionFailed(String),
    /// Command executed but the ack signal could not be asserted
    AckFailed(String),
    /// Post-ack pause finished
    CycleFinished,
}

impl HandshakeEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ReadyDetected => "ready_detected",
            Self::CommandAccepted(_) => "command_accepted",
            Self::CommandAbandoned(_) => "command_abandoned",
            Self::ExecutionSucceeded => "execution_succeeded",
            Self::ExecutionFailed(_) => "execution_failed",
            Self::AckFailed(_) => "ack_failed",
            Self::CycleFinished => "cycle_finished",
        }
    }

    /// Extract the reason if this event ends a cycle without an ack
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::CommandAbandoned(reason)
            | Self::ExecutionFailed(reason)
            | Self::AckFailed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Id carried by the event that accepts a command
    pub fn command_id(&self) -> Option<i64> {
        match self {
            Self::CommandAccepted(id) => Some(*id),
            _ => None,
        }
    }
}
