//! # Motor Controller
//!
//! The top-level handshake loop. Each cycle:
//!
//! 1. polls the ready signal until it is asserted (or cancellation),
//! 2. clears it before anything else, so a stale signal never re-triggers,
//! 3. reads and parses the command artifact,
//! 4. hands the command to the [`CommandExecutor`],
//! 5. asserts the ack signal, logs completion, and pauses briefly.
//!
//! Only one command is in flight. A ready signal asserted while a command is
//! executing is seen at the next poll and looks like a fresh command.
//!
//! Cancellation is observed by every wait: the ready poll and the shared-log
//! lock poll. A cancelled lock wait drops that log line; the rest of an
//! in-flight cycle still runs, so an executed command is still acknowledged,
//! and the loop stops at the next ready poll.
//!
//! Errors never stop the loop unless they are unrecoverable
//! ([`MotorCtrlError::is_recoverable`]) or `fail_on_log_error` is set and
//! the shared log cannot be written.

mod stats;

pub use stats::{HandshakeStats, HandshakeStatsSnapshot};

use crate::command::MotorCommand;
use crate::config::{MalformedCommandPolicy, MotorCtrlConfig};
use crate::constants::messages;
use crate::error::{MotorCtrlError, Result};
use crate::executor::{CommandExecutor, SimulatedMotorExecutor};
use crate::shared_log::SharedLog;
use crate::signal::{FileSignal, HandshakeSignal};
use crate::state_machine::{HandshakeEvent, HandshakeState, HandshakeStateMachine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How a handshake cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Command executed and ack asserted
    Acknowledged { command_id: i64 },
    /// Cycle dropped before execution; no ack
    Abandoned { reason: MotorCtrlError },
    /// Executor failed; no ack
    ExecutionFailed { command_id: i64, reason: String },
    /// Command executed but the ack signal could not be asserted
    AckFailed { command_id: i64, reason: String },
}

impl CycleOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged { .. })
    }
}

pub struct MotorController {
    controller_id: Uuid,
    config: MotorCtrlConfig,
    ready: Box<dyn HandshakeSignal>,
    ack: Box<dyn HandshakeSignal>,
    log: SharedLog,
    executor: Arc<dyn CommandExecutor>,
    state_machine: HandshakeStateMachine,
    stats: Arc<HandshakeStats>,
}

impl std::fmt::Debug for MotorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotorController")
            .field("controller_id", &self.controller_id)
            .field("config", &self.config)
            .field("ready", &self.ready.describe())
            .field("ack", &self.ack.describe())
            .field("executor", &self.executor.name())
            .field("state", &self.state_machine.current_state())
            .finish()
    }
}

impl MotorController {
    /// Create a controller using marker-file signals from `config`
    pub fn new(config: MotorCtrlConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        config.validate()?;

        let controller_id = Uuid::new_v4();
        info!(
            controller_id = %controller_id,
            executor = executor.name(),
            ready_flag = %config.ready_flag_path.display(),
            ack_flag = %config.ack_flag_path.display(),
            log_file = %config.log_file_path.display(),
            "Creating MotorController"
        );

        Ok(Self {
            controller_id,
            ready: Box::new(FileSignal::new(&config.ready_flag_path)),
            ack: Box::new(FileSignal::new(&config.ack_flag_path)),
            log: SharedLog::from_config(&config),
            executor,
            state_machine: HandshakeStateMachine::new(),
            stats: Arc::new(HandshakeStats::default()),
            config,
        })
    }

    /// Controller whose executor only waits `execution_delay_ms`
    pub fn simulated(config: MotorCtrlConfig) -> Result<Self> {
        let executor = Arc::new(SimulatedMotorExecutor::new(config.execution_delay()));
        Self::new(config, executor)
    }

    /// Replace the ready/ack transports
    pub fn with_signals(
        mut self,
        ready: Box<dyn HandshakeSignal>,
        ack: Box<dyn HandshakeSignal>,
    ) -> Self {
        self.ready = ready;
        self.ack = ack;
        self
    }

    pub fn controller_id(&self) -> Uuid {
        self.controller_id
    }

    pub fn state(&self) -> HandshakeState {
        self.state_machine.current_state()
    }

    pub fn stats(&self) -> Arc<HandshakeStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &MotorCtrlConfig {
        &self.config
    }

    /// Write the startup line and run handshake cycles until `cancel` fires
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            controller_id = %self.controller_id,
            poll_interval_ms = self.config.poll_interval_ms,
            "Starting motor controller handshake loop"
        );

        let started = messages::started(self.log.tag());
        self.write_log(&started, &cancel).await?;

        loop {
            match self.run_cycle(&cancel).await {
                Ok(Some(outcome)) => {
                    debug!(controller_id = %self.controller_id, outcome = ?outcome, "Handshake cycle finished");
                }
                Ok(None) => break,
                Err(e) if self.is_fatal(&e) => {
                    error!(
                        controller_id = %self.controller_id,
                        error = %e,
                        kind = e.kind(),
                        "Stopping motor controller"
                    );
                    return Err(e);
                }
                Err(e) => {
                    error!(
                        controller_id = %self.controller_id,
                        error = %e,
                        kind = e.kind(),
                        "Handshake cycle failed, resuming wait"
                    );
                    // Avoid spinning if the failure repeats immediately
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.poll_interval()) => {}
                    }
                }
            }
        }

        info!(
            controller_id = %self.controller_id,
            stats = %serde_json::to_string(&self.stats.snapshot()).unwrap_or_default(),
            "Motor controller stopped"
        );
        Ok(())
    }

    /// Wait for one command and process it
    ///
    /// Returns `Ok(None)` when cancelled while waiting. A cycle that has
    /// consumed the ready signal always runs to completion.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> Result<Option<CycleOutcome>> {
        if !self.wait_for_ready(cancel).await {
            return Ok(None);
        }

        let result = self.handle_ready(cancel).await;
        if result.is_err() {
            self.state_machine.reset();
        }
        result.map(Some)
    }

    /// WAITING_FOR_COMMAND: poll until the ready signal is asserted
    async fn wait_for_ready(&self, cancel: &CancellationToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }

            match self.ready.is_asserted().await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => warn!(
                    controller_id = %self.controller_id,
                    signal = %self.ready.describe(),
                    error = %e,
                    "Failed to poll ready signal"
                ),
            }

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    async fn handle_ready(&mut self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        // Consume before anything else so the same signal is never seen twice
        self.ready.clear().await?;
        self.state_machine.transition(HandshakeEvent::ReadyDetected)?;
        self.write_log(&messages::received(&self.config.upstream_name), cancel)
            .await?;

        let command = match self.receive_command(cancel).await? {
            Ok(command) => command,
            Err(reason) => {
                self.stats.record_abandoned();
                self.state_machine
                    .transition(HandshakeEvent::CommandAbandoned(reason.to_string()))?;
                return Ok(CycleOutcome::Abandoned { reason });
            }
        };

        self.execute_and_acknowledge(command, cancel).await
    }

    /// COMMAND_RECEIVED: read the artifact
    ///
    /// The outer `Result` carries errors that end the cycle abnormally; the
    /// inner one says whether the command was accepted or abandoned.
    async fn receive_command(
        &self,
        cancel: &CancellationToken,
    ) -> Result<std::result::Result<MotorCommand, MotorCtrlError>> {
        let path = &self.config.command_file_path;

        match MotorCommand::read_from(path).await {
            Ok(command) => {
                info!(
                    controller_id = %self.controller_id,
                    command_id = command.command_id,
                    "Received motor command"
                );
                Ok(Ok(command))
            }
            Err(e @ MotorCtrlError::CommandFileUnreadable { .. }) => {
                error!(controller_id = %self.controller_id, error = %e, "Abandoning handshake cycle");
                self.write_log(&messages::unreadable(&path.display().to_string()), cancel)
                    .await?;
                Ok(Err(e))
            }
            Err(MotorCtrlError::CommandMalformed { line, reason }) => {
                self.stats.record_malformed();
                match self.config.malformed_command_policy {
                    MalformedCommandPolicy::Abandon => {
                        error!(
                            controller_id = %self.controller_id,
                            line = %line,
                            reason = %reason,
                            "Abandoning malformed motor command"
                        );
                        self.write_log(&messages::malformed(&reason), cancel)
                            .await?;
                        Ok(Err(MotorCtrlError::CommandMalformed { line, reason }))
                    }
                    MalformedCommandPolicy::ExecuteSentinel => {
                        let sentinel = self.config.malformed_sentinel_id;
                        warn!(
                            controller_id = %self.controller_id,
                            line = %line,
                            reason = %reason,
                            sentinel_id = sentinel,
                            "Executing sentinel id for malformed motor command"
                        );
                        self.write_log(&messages::malformed_sentinel(sentinel), cancel)
                            .await?;
                        Ok(Ok(MotorCommand::new(sentinel)))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// EXECUTING then ACK_SENT
    async fn execute_and_acknowledge(
        &mut self,
        command: MotorCommand,
        cancel: &CancellationToken,
    ) -> Result<CycleOutcome> {
        let command_id = command.command_id;
        self.state_machine
            .transition(HandshakeEvent::CommandAccepted(command_id))?;

        if let Err(e) = self.executor.execute(&command).await {
            let reason = e.to_string();
            error!(
                controller_id = %self.controller_id,
                command_id,
                executor = self.executor.name(),
                error = %reason,
                "Motor command failed"
            );
            self.stats.record_execution_failure();
            self.write_log(&messages::execution_failed(command_id, &reason), cancel)
                .await?;
            self.state_machine
                .transition(HandshakeEvent::ExecutionFailed(reason.clone()))?;
            return Ok(CycleOutcome::ExecutionFailed { command_id, reason });
        }

        self.state_machine
            .transition(HandshakeEvent::ExecutionSucceeded)?;

        if let Err(e) = self.ack.assert().await {
            let reason = e.to_string();
            error!(
                controller_id = %self.controller_id,
                command_id,
                ack = %self.ack.describe(),
                error = %reason,
                "Motor command executed but ack could not be asserted"
            );
            self.stats.record_ack_failure();
            self.write_log(&messages::ack_failed(command_id, &reason), cancel)
                .await?;
            self.state_machine
                .transition(HandshakeEvent::AckFailed(reason.clone()))?;
            return Ok(CycleOutcome::AckFailed { command_id, reason });
        }

        self.stats.record_ack();
        self.write_log(&messages::executed(command_id), cancel).await?;
        info!(
            controller_id = %self.controller_id,
            command_id,
            ack = %self.ack.describe(),
            "Motor command acknowledged"
        );

        // Give the producer time to observe the ack before polling again
        tokio::time::sleep(self.config.post_ack_delay()).await;
        self.state_machine.transition(HandshakeEvent::CycleFinished)?;

        Ok(CycleOutcome::Acknowledged { command_id })
    }

    /// Append to the shared log, applying the `fail_on_log_error` policy
    ///
    /// A line dropped because of cancellation never fails the caller.
    async fn write_log(&self, message: &str, cancel: &CancellationToken) -> Result<()> {
        match self.log.log(message, cancel).await {
            Ok(()) => Ok(()),
            Err(MotorCtrlError::Cancelled) => {
                self.stats.record_log_write_failure();
                warn!(
                    controller_id = %self.controller_id,
                    line = %message,
                    "Shutdown interrupted shared log write, line dropped"
                );
                Ok(())
            }
            Err(e) => {
                self.stats.record_log_write_failure();
                error!(
                    controller_id = %self.controller_id,
                    error = %e,
                    line = %message,
                    "Failed to write shared log line"
                );
                if self.config.fail_on_log_error {
                    Err(e)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn is_fatal(&self, error: &MotorCtrlError) -> bool {
        if !error.is_recoverable() {
            return true;
        }
        self.config.fail_on_log_error
            && matches!(
                error,
                MotorCtrlError::LogWriteFailure { .. }
                    | MotorCtrlError::LockTimeout { .. }
                    | MotorCtrlError::Lock { .. }
            )
    }
}
