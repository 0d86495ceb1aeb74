//! Per-user serialization of session mutations.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

// Idle entries are pruned once the map grows past this.
const PRUNE_THRESHOLD: usize = 1024;

/// Hands out one async mutex per user.
///
/// Holding the guard serializes find-or-create, cap checks and
/// read-modify-write cycles on that user's sessions. Different users never
/// contend. When disabled, [`UserLocks::acquire`] returns `None` immediately.
pub struct UserLocks {
    enabled: bool,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wait for the user's lock.
    pub async fn acquire(&self, user_id: &str) -> Option<OwnedMutexGuard<()>> {
        if !self.enabled {
            return None;
        }
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        Some(lock.lock_owned().await)
    }
}
