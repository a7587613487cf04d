use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// One async mutex per key, created on demand and dropped once nobody holds
/// or waits on it.
#[derive(Default)]
pub struct KeyLocks {
    table: Arc<LockTable>,
}

pub struct KeyGuard {
    key: String,
    table: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(table.entry(key.to_string()).or_default())
        };

        KeyGuard {
            key: key.to_string(),
            table: Arc::clone(&self.table),
            guard: Some(entry.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if table.get(&self.key).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            table.remove(&self.key);
        }
    }
}
