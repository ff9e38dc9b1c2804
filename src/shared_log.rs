//! # Shared Log Writer
//!
//! Appends tagged lines to the log file every sibling process writes to.
//! Each call takes the [`FileLock`], opens the log in append mode, writes
//! exactly one line, flushes, and releases the lock. A failed append is
//! returned to the caller after the lock has been released. Cancellation
//! while waiting for the lock drops the line with
//! [`MotorCtrlError::Cancelled`].

use crate::config::MotorCtrlConfig;
use crate::error::{MotorCtrlError, Result};
use crate::lock::FileLock;
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct SharedLog {
    path: PathBuf,
    tag: String,
    timestamps: bool,
    lock: FileLock,
}

impl SharedLog {
    pub fn new(path: impl Into<PathBuf>, tag: impl Into<String>, lock: FileLock) -> Self {
        Self {
            path: path.into(),
            tag: tag.into(),
            timestamps: false,
            lock,
        }
    }

    pub fn from_config(config: &MotorCtrlConfig) -> Self {
        Self::new(
            &config.log_file_path,
            config.process_tag.clone(),
            FileLock::from_config(config),
        )
        .with_timestamps(config.log_timestamps)
    }

    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Append `[<tag>] <message>` as one line under the shared log lock
    pub async fn log(&self, message: &str, cancel: &CancellationToken) -> Result<()> {
        let line = self.format_line(message);
        let path = self.path.as_path();
        let bytes = line.as_bytes();

        self.lock
            .with_lock(cancel, || async move {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|e| MotorCtrlError::log_write_failure(path, e))?;

                // One write per line so a reader never sees half an entry
                file.write_all(bytes)
                    .await
                    .map_err(|e| MotorCtrlError::log_write_failure(path, e))?;
                file.flush()
                    .await
                    .map_err(|e| MotorCtrlError::log_write_failure(path, e))?;

                Ok(())
            })
            .await?;

        trace!(log = %self.path.display(), line = %line.trim_end(), "Appended shared log line");
        Ok(())
    }

    fn format_line(&self, message: &str) -> String {
        // Embedded line breaks would split one entry into several lines
        let message = message.replace(['\r', '\n'], " ");
        if self.timestamps {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            format!("[{}] {} {}\n", self.tag, now, message)
        } else {
            format!("[{}] {}\n", self.tag, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_log(dir: &Path) -> SharedLog {
        SharedLog::new(
            dir.join("system_log.txt"),
            "C",
            FileLock::new(dir.join("log.lock"), Duration::from_millis(2)),
        )
    }

    #[test]
    fn test_line_format() {
        let log = test_log(Path::new("/tmp"));
        assert_eq!(log.format_line("Process C started."), "[C] Process C started.\n");
        assert_eq!(log.format_line("two\nlines"), "[C] two lines\n");
    }

    #[test]
    fn test_timestamped_line_format() {
        let log = test_log(Path::new("/tmp")).with_timestamps(true);
        let line = log.format_line("hello");
        assert!(line.starts_with("[C] "));
        assert!(line.ends_with(" hello\n"));
        let stamp = line.trim_start_matches("[C] ").trim_end_matches(" hello\n");
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[tokio::test]
    async fn test_log_appends_lines_in_call_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = test_log(dir.path());

        let cancel = CancellationToken::new();
        log.log("first", &cancel).await.unwrap();
        log.log("second", &cancel).await.unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "[C] first\n[C] second\n");
        assert!(!dir.path().join("log.lock").exists());
    }

    #[tokio::test]
    async fn test_failed_append_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let log = SharedLog::new(
            dir.path(),
            "C",
            FileLock::new(dir.path().join("log.lock"), Duration::from_millis(2)),
        );

        let err = log.log("lost?", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, MotorCtrlError::LogWriteFailure { .. }));
        assert!(!dir.path().join("log.lock").exists());
    }

    #[tokio::test]
    async fn test_cancelled_wait_drops_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = test_log(dir.path());
        std::fs::File::create(dir.path().join("log.lock")).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = log.log("never written", &cancel).await.unwrap_err();

        assert_eq!(err, MotorCtrlError::Cancelled);
        assert!(!log.path().exists());
    }
}
