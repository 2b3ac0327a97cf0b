//! Local run state for the deployment system.
//!
//! Remote state is never persisted; the only local state is the run lock that
//! serializes applies against one target workspace.

mod lock;

pub use lock::{generate_holder_id, LockInfo, RunLock, LOCK_DIR, LOCK_EXPIRY_SECS};
