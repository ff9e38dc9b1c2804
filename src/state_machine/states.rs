use serde::{Deserialize, Serialize};
use std::fmt;

/// Handshake states for one command cycle
///
/// The cycle has no terminal state: `AckSent` always returns to
/// `WaitingForCommand`, and only external cancellation stops the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeState {
    /// Polling for the ready signal
    #[default]
    WaitingForCommand,
    /// Ready signal consumed; command artifact not yet parsed
    CommandReceived,
    /// Command handed to the executor
    Executing,
    /// Ack signal asserted; pausing before the next poll
    AckSent,
}

impl HandshakeState {
    /// Whether a command is in flight (ready consumed, cycle not finished)
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::WaitingForCommand)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForCommand => write!(f, "waiting_for_command"),
            Self::CommandReceived => write!(f, "command_received"),
            Self::Executing => write!(f, "executing"),
            Self::AckSent => write!(f, "ack_sent"),
        }
    }
}

impl std::str::FromStr for HandshakeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting_for_command" => Ok(Self::WaitingForCommand),
            "command_received" => Ok(Self::CommandReceived),
            "executing" => Ok(Self::Executing),
            "ack_sent" => Ok(Self::AckSent),
            _ => Err(format!("Invalid handshake state: {s}")),
        }
    }
}
