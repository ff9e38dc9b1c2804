//! Command artifact deposited by the upstream process.
//!
//! The artifact is a text file whose first line reads `command_id: <int>`.
//! Later lines are ignored.

use crate::error::{MotorCtrlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const COMMAND_ID_KEY: &str = "command_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotorCommand {
    pub command_id: i64,
}

impl MotorCommand {
    pub fn new(command_id: i64) -> Self {
        Self { command_id }
    }

    /// Parse the first line of a command artifact
    pub fn parse(contents: &str) -> Result<Self> {
        let line = contents.lines().next().unwrap_or("");
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return Err(MotorCtrlError::command_malformed(line, "empty command payload"));
        }

        let rest = trimmed
            .strip_prefix(COMMAND_ID_KEY)
            .ok_or_else(|| MotorCtrlError::command_malformed(line, "missing command_id key"))?;
        let value = rest
            .trim_start()
            .strip_prefix(':')
            .ok_or_else(|| MotorCtrlError::command_malformed(line, "missing ':' separator"))?
            .trim();

        let command_id = value.parse::<i64>().map_err(|e| {
            MotorCtrlError::command_malformed(line, format!("invalid command id {value:?}: {e}"))
        })?;

        Ok(Self { command_id })
    }

    /// Read and parse the command artifact at `path`
    ///
    /// A missing or unopenable file is [`MotorCtrlError::CommandFileUnreadable`];
    /// an unparsable first line is [`MotorCtrlError::CommandMalformed`].
    pub async fn read_from(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MotorCtrlError::command_file_unreadable(path, e))?;
        Self::parse(&contents)
    }
}

impl FromStr for MotorCommand {
    type Err = MotorCtrlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COMMAND_ID_KEY}: {}", self.command_id)
    }
}
