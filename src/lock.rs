//! # Shared Log Lock
//!
//! Mutual exclusion between sibling processes over the shared log. The lock
//! is held while an empty marker file exists at the configured path.
//!
//! The marker is created with **create_new** semantics (exclusive create),
//! so checking for the marker and asserting it is a single filesystem
//! operation: two acquirers can never both succeed.
//!
//! Acquisition polls at a fixed interval. There is no fairness guarantee,
//! and no owner identity is recorded in the marker. A process that dies
//! while holding the lock orphans the marker; configure a lock timeout to
//! surface that as [`MotorCtrlError::LockTimeout`] instead of hanging, and a
//! stale threshold to break markers older than any legitimate hold.
//!
//! Marker age is the only liveness evidence, so the stale threshold must be
//! longer than the longest time any sibling holds the lock. A holder that
//! outlives the threshold loses the lock to the next waiter.
//!
//! Breaking is itself exclusive: the stale marker is renamed to a unique
//! tombstone before removal, so among several waiters that judged the same
//! marker stale only the first rename succeeds. A tombstone that turns out
//! to be younger than the marker that was inspected belongs to a fresh
//! holder and is linked back into place instead of being deleted.
//!
//! Every wait also watches a [`CancellationToken`] and gives up with
//! [`MotorCtrlError::Cancelled`] once it fires.

use crate::config::MotorCtrlConfig;
use crate::error::{MotorCtrlError, Result};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Marker-file lock over a resource shared with other processes
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    poll_interval: Duration,
    timeout: Option<Duration>,
    stale_after: Option<Duration>,
}

impl FileLock {
    /// Lock that waits forever and never breaks an existing marker
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            timeout: None,
            stale_after: None,
        }
    }

    pub fn from_config(config: &MotorCtrlConfig) -> Self {
        Self::new(&config.lock_file_path, config.lock_poll_interval())
            .with_timeout(config.lock_timeout())
            .with_stale_after(config.stale_lock_after())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any process currently holds the lock
    pub async fn is_held(&self) -> Result<bool> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| MotorCtrlError::lock(&self.path, e))
    }

    /// Single non-blocking attempt to assert the marker
    pub async fn try_acquire(&self) -> Result<Option<LockGuard>> {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(_) => Ok(Some(LockGuard::new(self.path.clone()))),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(MotorCtrlError::lock(&self.path, e)),
        }
    }

    /// Block until the marker can be asserted
    ///
    /// Fails with [`MotorCtrlError::LockTimeout`] once the configured timeout
    /// elapses, or [`MotorCtrlError::Cancelled`] if `cancel` fires while
    /// waiting. A free lock is taken even after cancellation.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<LockGuard> {
        let started = Instant::now();

        loop {
            if let Some(guard) = self.try_acquire().await? {
                debug!(
                    lock = %self.path.display(),
                    waited_ms = millis(started.elapsed()),
                    "Acquired shared log lock"
                );
                return Ok(guard);
            }

            if self.break_if_stale().await? {
                continue;
            }

            if let Some(timeout) = self.timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    warn!(
                        lock = %self.path.display(),
                        waited_ms = millis(waited),
                        "Gave up waiting for shared log lock"
                    );
                    return Err(MotorCtrlError::lock_timeout(&self.path, millis(waited)));
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(
                        lock = %self.path.display(),
                        waited_ms = millis(started.elapsed()),
                        "Cancelled while waiting for shared log lock"
                    );
                    return Err(MotorCtrlError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Run `action` while holding the lock
    ///
    /// The lock is released after `action` finishes whether or not it
    /// succeeded; an error from `action` is returned only after the release.
    pub async fn with_lock<F, Fut, T>(&self, cancel: &CancellationToken, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.acquire(cancel).await?;
        let outcome = action().await;
        let released = guard.release().await;

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_error)) => Err(release_error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(release_error)) => {
                warn!(
                    lock = %self.path.display(),
                    error = %release_error,
                    "Failed to release shared log lock after failed action"
                );
                Err(error)
            }
        }
    }

    /// Remove the marker if it is older than the stale threshold
    ///
    /// Returns `true` when the caller should retry immediately.
    async fn break_if_stale(&self) -> Result<bool> {
        let Some(stale_after) = self.stale_after else {
            return Ok(false);
        };

        let inspected = match marker_mtime(&self.path).await? {
            Some(modified) => modified,
            None => return Ok(true),
        };

        let age = SystemTime::now()
            .duration_since(inspected)
            .unwrap_or(Duration::ZERO);
        if age < stale_after {
            return Ok(false);
        }

        let tombstone = self.tombstone_path();
        match tokio::fs::rename(&self.path, &tombstone).await {
            Ok(()) => {}
            // Another waiter broke it first
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(MotorCtrlError::lock(&self.path, e)),
        }

        if marker_mtime(&tombstone).await? != Some(inspected) {
            // The marker was replaced by a live holder between inspection
            // and rename; put it back
            warn!(
                lock = %self.path.display(),
                "Lock marker changed while breaking it, restoring"
            );
            let restored = tokio::fs::hard_link(&tombstone, &self.path).await;
            remove_tombstone(&tombstone).await;
            return match restored {
                Ok(()) => Ok(false),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(
                        lock = %self.path.display(),
                        "Lock re-acquired before the marker could be restored"
                    );
                    Ok(false)
                }
                Err(e) => Err(MotorCtrlError::lock(&self.path, e)),
            };
        }

        warn!(
            lock = %self.path.display(),
            age_ms = millis(age),
            "Breaking stale shared log lock"
        );
        remove_tombstone(&tombstone).await;
        Ok(true)
    }

    fn tombstone_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lock".to_string());
        self.path
            .with_file_name(format!("{name}.stale-{}", Uuid::new_v4().simple()))
    }
}

async fn marker_mtime(path: &Path) -> Result<Option<SystemTime>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata
            .modified()
            .map(Some)
            .map_err(|e| MotorCtrlError::lock(path, e)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MotorCtrlError::lock(path, e)),
    }
}

async fn remove_tombstone(tombstone: &Path) {
    if let Err(e) = tokio::fs::remove_file(tombstone).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(tombstone = %tombstone.display(), error = %e, "Failed to remove lock tombstone");
        }
    }
}

/// Proof that the lock marker is held
///
/// Call [`release`](LockGuard::release) to clear the marker and observe
/// failures. A guard dropped without release (panic or cancelled future)
/// removes the marker synchronously and only logs a failure.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(lock = %self.path.display(), "Lock marker vanished while held");
                Ok(())
            }
            Err(e) => Err(MotorCtrlError::lock(&self.path, e)),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(
                    lock = %self.path.display(),
                    error = %e,
                    "Failed to remove lock marker on drop"
                );
            }
        }
    }
}
