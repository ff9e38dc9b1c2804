//! # Handshake Signals
//!
//! A signal is a single bit shared between two processes: asserted or
//! cleared. The state machine only talks to the [`HandshakeSignal`] trait, so
//! the transport can be swapped without touching the handshake.
//!
//! [`FileSignal`] is the on-disk transport the sibling processes use: the
//! signal is asserted while an empty marker file exists. [`MemorySignal`]
//! keeps the bit in process memory, for embedding and tests.

use crate::error::{MotorCtrlError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A two-state (asserted/cleared) signal shared with another party
#[async_trait]
pub trait HandshakeSignal: Send + Sync {
    async fn is_asserted(&self) -> Result<bool>;

    /// Assert the signal. Asserting an already asserted signal is a no-op.
    async fn assert(&self) -> Result<()>;

    /// Clear the signal. Clearing an already cleared signal is a no-op.
    async fn clear(&self) -> Result<()>;

    /// Human-readable location used in logs
    fn describe(&self) -> String;
}

/// Signal backed by the presence of an empty marker file
#[derive(Debug, Clone)]
pub struct FileSignal {
    path: PathBuf,
}

impl FileSignal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HandshakeSignal for FileSignal {
    async fn is_asserted(&self) -> Result<bool> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| MotorCtrlError::signal(&self.path, e))
    }

    async fn assert(&self) -> Result<()> {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await
            .map(|_| ())
            .map_err(|e| MotorCtrlError::signal(&self.path, e))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MotorCtrlError::signal(&self.path, e)),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Signal held in process memory; clones share the same bit
#[derive(Debug, Clone, Default)]
pub struct MemorySignal {
    name: String,
    asserted: Arc<AtomicBool>,
}

impl MemorySignal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asserted: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl HandshakeSignal for MemorySignal {
    async fn is_asserted(&self) -> Result<bool> {
        Ok(self.asserted.load(Ordering::SeqCst))
    }

    async fn assert(&self) -> Result<()> {
        self.asserted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.asserted.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}
