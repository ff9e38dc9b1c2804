// State machine module for the command handshake
//
// One command slot, one ack slot: WAITING_FOR_COMMAND -> COMMAND_RECEIVED ->
// EXECUTING -> ACK_SENT -> WAITING_FOR_COMMAND, with early exits back to
// waiting when a command is abandoned or fails.

pub mod events;
pub mod handshake_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use events::HandshakeEvent;
pub use handshake_state_machine::HandshakeStateMachine;
pub use states::HandshakeState;
