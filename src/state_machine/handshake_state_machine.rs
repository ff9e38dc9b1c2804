use super::{events::HandshakeEvent, states::HandshakeState};
use crate::error::{MotorCtrlError, Result};

/// In-memory state machine for the single-slot command handshake
///
/// Holds the current state and the id of the command in flight. Nothing is
/// persisted: a restarted process always begins in `WaitingForCommand`.
#[derive(Debug, Default)]
pub struct HandshakeStateMachine {
    state: HandshakeState,
    command_id: Option<i64>,
    transitions: u64,
}

impl HandshakeStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state(&self) -> HandshakeState {
        self.state
    }

    /// Id of the command currently in flight, if one was accepted
    pub fn command_id(&self) -> Option<i64> {
        self.command_id
    }

    /// Total transitions applied since construction
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Apply `event`, returning the new state
    pub fn transition(&mut self, event: HandshakeEvent) -> Result<HandshakeState> {
        let from = self.state;
        let to = Self::determine_target_state(from, &event)?;

        if let Some(id) = event.command_id() {
            self.command_id = Some(id);
        } else if !to.is_active() {
            self.command_id = None;
        }

        self.state = to;
        self.transitions += 1;

        crate::log_handshake!(
            debug,
            "transition",
            from: from,
            to: to,
            event: event.event_type(),
            command_id: self.command_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            reason: event.error_message().unwrap_or("-")
        );

        Ok(to)
    }

    /// Force the machine back to `WaitingForCommand` after a cycle was cut
    /// short by an error that left it mid-cycle
    pub fn reset(&mut self) {
        if self.state.is_active() {
            tracing::warn!(
                from = %self.state,
                command_id = ?self.command_id,
                "Resetting handshake to waiting_for_command"
            );
        }
        self.state = HandshakeState::WaitingForCommand;
        self.command_id = None;
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(
        current_state: HandshakeState,
        event: &HandshakeEvent,
    ) -> Result<HandshakeState> {
        let target = match (current_state, event) {
            (HandshakeState::WaitingForCommand, HandshakeEvent::ReadyDetected) => {
                HandshakeState::CommandReceived
            }

            (HandshakeState::CommandReceived, HandshakeEvent::CommandAccepted(_)) => {
                HandshakeState::Executing
            }
            (HandshakeState::CommandReceived, HandshakeEvent::CommandAbandoned(_)) => {
                HandshakeState::WaitingForCommand
            }

            (HandshakeState::Executing, HandshakeEvent::ExecutionSucceeded) => {
                HandshakeState::AckSent
            }
            (HandshakeState::Executing, HandshakeEvent::ExecutionFailed(_)) => {
                HandshakeState::WaitingForCommand
            }

            (HandshakeState::AckSent, HandshakeEvent::CycleFinished) => {
                HandshakeState::WaitingForCommand
            }
            (HandshakeState::AckSent, HandshakeEvent::AckFailed(_)) => {
                HandshakeState::WaitingForCommand
            }

            (from_state, event) => {
                return Err(MotorCtrlError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}
