//! FetchGate - テナントごとに fetch を直列化する
//!
//! シグナルはテナント単位の単一スロットなので、同じテナントで fetch が
//! 2 つ同時に走ると、片方宛ての通知がもう片方を起こしてしまう。
//! gate は submit から結果ストリームの終了まで保持される。

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::CorrelationKey;

/// Held while a fetch is in flight for a key.
pub type GatePermit = OwnedMutexGuard<()>;

pub struct FetchGate<K = CorrelationKey> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> FetchGate<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.clone()).or_default().clone()
    }

    /// Wait (FIFO) until no other fetch holds `key`.
    pub async fn acquire(&self, key: &K) -> GatePermit {
        self.lock_for(key).lock_owned().await
    }

    /// Take the gate only if it is free right now.
    pub fn try_acquire(&self, key: &K) -> Option<GatePermit> {
        self.lock_for(key).try_lock_owned().ok()
    }
}

impl<K: Eq + Hash + Clone> Default for FetchGate<K> {
    fn default() -> Self {
        Self::new()
    }
}
