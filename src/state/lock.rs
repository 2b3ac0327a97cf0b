//! Run locking for concurrent apply protection.
//!
//! A lock file per target workspace keeps two operators sharing a checkout
//! from applying to the same workspace at once. Expired locks are taken over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{FabricDeployError, Result, StateError};

/// Lock expiry duration in seconds.
pub const LOCK_EXPIRY_SECS: i64 = 1800;

/// Directory holding lock files, relative to the config file.
pub const LOCK_DIR: &str = ".fabric-deploy";

/// Information about a run lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Who holds the lock.
    pub holder: String,
    /// Workspace the run targets.
    pub target_workspace_id: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

/// File-backed lock on a target workspace.
#[derive(Debug, Clone)]
pub struct RunLock {
    /// Path to the lock file.
    path: PathBuf,
    /// Target workspace id.
    target_workspace_id: String,
}

impl LockInfo {
    /// Creates a new lock info.
    #[must_use]
    pub fn new(holder: &str, target_workspace_id: &str) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            target_workspace_id: target_workspace_id.to_string(),
            acquired_at: now,
            expires_at: now + chrono::Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the remaining time until expiry in seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        let remaining = self.expires_at - Utc::now();
        remaining.num_seconds().max(0)
    }
}

impl RunLock {
    /// Creates a lock for a target workspace under the given base directory.
    #[must_use]
    pub fn new(base_dir: &Path, target_workspace_id: &str) -> Self {
        Self {
            path: base_dir.join(LOCK_DIR).join(format!("{target_workspace_id}.lock")),
            target_workspace_id: target_workspace_id.to_string(),
        }
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquires the lock.
    ///
    /// The lock file is created exclusively, so of two concurrent runs only
    /// one succeeds. An expired lock is removed and creation retried once.
    /// An empty holder is replaced by a generated id.
    ///
    /// # Errors
    ///
    /// Returns an error if an unexpired lock exists or the file cannot be written.
    pub async fn acquire(&self, holder: &str) -> Result<LockInfo> {
        let holder_id = if holder.is_empty() {
            generate_holder_id()
        } else {
            holder.to_string()
        };
        let lock_info = LockInfo::new(&holder_id, &self.target_workspace_id);

        for _ in 0..2 {
            if self.write(&lock_info).await? {
                info!(
                    "Acquired run lock: {} (expires in {}s)",
                    lock_info.lock_id, LOCK_EXPIRY_SECS
                );
                return Ok(lock_info);
            }

            match self.read().await? {
                Some(existing) if !existing.is_expired() => {
                    return Err(FabricDeployError::State(StateError::LockedByOther {
                        holder: existing.holder,
                        since: existing.acquired_at.to_rfc3339(),
                    }));
                }
                Some(_) => {
                    debug!("Expired lock found, taking over");
                    self.remove().await?;
                }
                None => {}
            }
        }

        Err(StateError::LockFailed {
            message: format!("Lock file {} keeps changing", self.path.display()),
        }
        .into())
    }

    /// Releases the lock if it is still ours.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be read or removed.
    pub async fn release(&self, lock_id: &str) -> Result<()> {
        if let Some(existing) = self.read().await? {
            if existing.lock_id == lock_id {
                self.remove().await?;
                info!("Released run lock: {lock_id}");
            } else {
                debug!("Lock ID mismatch: expected {lock_id}, found {}", existing.lock_id);
            }
        }
        Ok(())
    }

    /// Returns the current lock, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file is unreadable.
    pub async fn read(&self) -> Result<Option<LockInfo>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| StateError::LockFailed {
            message: format!("Failed to read lock file: {e}"),
        })?;

        let lock_info = serde_json::from_str(&content).map_err(|e| StateError::Corrupted {
            message: format!("Failed to parse lock file {}: {e}", self.path.display()),
        })?;

        Ok(Some(lock_info))
    }

    /// Creates the lock file, returning false if one already exists.
    async fn write(&self, lock_info: &LockInfo) -> Result<bool> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(lock_info).map_err(|e| StateError::LockFailed {
            message: format!("Failed to serialize lock: {e}"),
        })?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(StateError::LockFailed {
                    message: format!("Failed to create lock file: {e}"),
                }
                .into());
            }
        };

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StateError::LockFailed {
                message: format!("Failed to write lock file: {e}"),
            })?;
        file.sync_all().await.map_err(|e| StateError::LockFailed {
            message: format!("Failed to sync lock file: {e}"),
        })?;

        Ok(true)
    }

    /// Removes the lock file; a file that is already gone is not an error.
    async fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::LockFailed {
                message: format!("Failed to delete lock file: {e}"),
            }
            .into()),
        }
    }
}

/// Generates a unique holder identifier for the current process.
#[must_use]
pub fn generate_holder_id() -> String {
    let hostname = hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());

    let pid = std::process::id();
    let uuid = &Uuid::new_v4().to_string()[..8];

    format!("{hostname}-{pid}-{uuid}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_info() {
        let info = LockInfo::new("alice", "ws");
        assert_eq!(info.holder, "alice");
        assert!(!info.is_expired());
        assert!(info.remaining_secs() > LOCK_EXPIRY_SECS - 60);
    }

    #[test]
    fn test_holder_id_generation() {
        let id1 = generate_holder_id();
        let id2 = generate_holder_id();

        assert_ne!(id1, id2);
        assert!(id1.contains(&std::process::id().to_string()));
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let lock = RunLock::new(temp.path(), "ws");

        let info = lock.acquire("alice").await.expect("Acquire failed");
        assert!(lock.path().exists());
        assert!(lock.path().ends_with(".fabric-deploy/ws.lock"));

        let second = lock.acquire("bob").await;
        assert!(matches!(
            second,
            Err(FabricDeployError::State(StateError::LockedByOther { ref holder, .. })) if holder == "alice"
        ));

        lock.release(&info.lock_id).await.expect("Release failed");
        assert!(!lock.path().exists());
        assert!(lock.acquire("bob").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_lock_is_taken_over() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let lock = RunLock::new(temp.path(), "ws");

        let mut stale = LockInfo::new("alice", "ws");
        stale.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(lock.write(&stale).await.expect("Write failed"));

        let info = lock.acquire("").await.expect("Acquire failed");
        assert_ne!(info.holder, "alice");
    }

    #[tokio::test]
    async fn test_concurrent_acquire_has_one_winner() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let first = RunLock::new(temp.path(), "ws");
        let second = first.clone();

        let (a, b) = tokio::join!(first.acquire("alice"), second.acquire("bob"));

        assert!(a.is_ok() != b.is_ok());
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser,
            Err(FabricDeployError::State(
                StateError::LockedByOther { .. } | StateError::Corrupted { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_existing_lock_is_not_overwritten() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let lock = RunLock::new(temp.path(), "ws");

        let held = lock.acquire("alice").await.expect("Acquire failed");
        let other = LockInfo::new("bob", "ws");
        assert!(!lock.write(&other).await.expect("Write failed"));

        let current = lock.read().await.expect("Read failed").expect("Lock missing");
        assert_eq!(current.lock_id, held.lock_id);
    }

    #[tokio::test]
    async fn test_release_ignores_foreign_lock() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let lock = RunLock::new(temp.path(), "ws");

        lock.acquire("alice").await.expect("Acquire failed");
        lock.release("someone-else").await.expect("Release failed");
        assert!(lock.read().await.expect("Read failed").is_some());
    }

    #[tokio::test]
    async fn test_corrupted_lock() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let lock = RunLock::new(temp.path(), "ws");
        std::fs::create_dir_all(temp.path().join(LOCK_DIR)).expect("Failed to create dir");
        std::fs::write(lock.path(), "not json").expect("Failed to write");

        assert!(matches!(
            lock.read().await,
            Err(FabricDeployError::State(StateError::Corrupted { .. }))
        ));
    }
}
