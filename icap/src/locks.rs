//! Per-appliance locks
//!
//! Serializes create/delete tasks that target the same `(owner, name)` so two
//! workers never deploy and destroy the same appliance at once. Tasks for
//! different appliances still run in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Key = (String, String);

/// Name-keyed lock table
#[derive(Debug, Default)]
pub struct NameLocks {
    locks: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `owner`'s appliance `name`
    pub async fn acquire(&self, owner: &str, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((owner.to_string(), name.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of names currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
