use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle entries are swept once the map grows past this size.
const PRUNE_THRESHOLD: usize = 256;

/// Per-identity mutual exclusion. Work on different identities proceeds in
/// parallel; work on the same identity runs one at a time.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let entry = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

            if locks.len() >= PRUNE_THRESHOLD {
                // Only the map holds a reference to idle entries
                locks.retain(|_, m| Arc::strong_count(m) > 1);
            }

            locks.entry(key.to_string()).or_default().clone()
        };

        KeyGuard {
            _guard: entry.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
