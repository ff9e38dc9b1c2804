#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Motor Controller Core
//!
//! One node ("Process C") in a multi-process command pipeline that
//! coordinates through files in a shared directory instead of pipes or
//! sockets.
//!
//! ## Overview
//!
//! The upstream process writes a command file and raises a ready marker.
//! This process clears the marker, parses `command_id: <int>`, runs the
//! command, raises an ack marker and writes a completion line to a log file
//! shared by every sibling. Log appends are serialized by a lock marker so
//! lines from different processes never interleave.
//!
//! ## Module Organization
//!
//! - [`config`] - Artifact paths, intervals and policies
//! - [`error`] - Structured error handling
//! - [`lock`] - Create-exclusive marker lock with scoped release
//! - [`shared_log`] - Tagged, lock-protected log appends
//! - [`signal`] - Ready/ack signal abstraction and transports
//! - [`command`] - Command artifact parsing
//! - [`executor`] - Pluggable command execution
//! - [`state_machine`] - Handshake states and transitions
//! - [`controller`] - The polling handshake loop
//! - [`logging`] - Process-local tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use motor_ctrl::{MotorController, MotorCtrlConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> motor_ctrl::Result<()> {
//! let config = MotorCtrlConfig::load(None)?;
//! let mut controller = MotorController::simulated(config)?;
//! controller.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod executor;
pub mod lock;
pub mod logging;
pub mod shared_log;
pub mod signal;
pub mod state_machine;

pub use command::MotorCommand;
pub use config::{MalformedCommandPolicy, MotorCtrlConfig};
pub use controller::{CycleOutcome, HandshakeStats, HandshakeStatsSnapshot, MotorController};
pub use error::{MotorCtrlError, Result};
pub use executor::{CommandExecutor, SimulatedMotorExecutor};
pub use lock::{FileLock, LockGuard};
pub use shared_log::SharedLog;
pub use signal::{FileSignal, HandshakeSignal, MemorySignal};
pub use state_machine::{HandshakeEvent, HandshakeState, HandshakeStateMachine};
