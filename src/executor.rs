//! Command execution seam.
//!
//! What a command physically does is outside the handshake. The controller
//! only needs something that takes a [`MotorCommand`] and eventually reports
//! success or failure.

use crate::command::MotorCommand;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &MotorCommand) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Stand-in for real motor work: waits a fixed delay and succeeds
#[derive(Debug, Clone)]
pub struct SimulatedMotorExecutor {
    delay: Duration,
}

impl SimulatedMotorExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl CommandExecutor for SimulatedMotorExecutor {
    async fn execute(&self, command: &MotorCommand) -> Result<()> {
        debug!(
            command_id = command.command_id,
            delay = ?self.delay,
            "Simulating motor command"
        );
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated_motor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_executor_waits_for_delay() {
        let executor = SimulatedMotorExecutor::new(Duration::from_millis(500));
        let started = tokio::time::Instant::now();

        executor.execute(&MotorCommand::new(1)).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(executor.name(), "simulated_motor");
    }
}
