//! SignalRegistry - キーごとの単一スロット通知
//!
//! # 学習ポイント
//! - map の変更は 1 つの Mutex、実際の待機はキーごとの `Notify`
//!   （あるテナントの待機が別テナントをブロックしない）
//! - `Notify::notify_one` は待機者がいなければ permit を 1 つだけ保存する
//!   → signal が wait より先に来ても取りこぼさない
//! - Mutex を保持したまま `.await` しない

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use crate::domain::CorrelationKey;

/// Handle to one key's signal.
///
/// States: unset → set → (consumed by one `wait`) → unset. Signalling an
/// already set slot is a no-op; there is no counter.
#[derive(Debug, Clone, Default)]
pub struct SignalHandle {
    notify: Arc<Notify>,
}

impl SignalHandle {
    /// Set the slot, waking at most one waiter.
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    /// Wait until the slot is set, then clear it.
    ///
    /// Returns immediately if the slot was already set. If the returned
    /// future is dropped after being chosen by `signal`, the permit passes on
    /// to the next waiter instead of being lost.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Process-wide table of lazily created signals.
///
/// Never fails and knows nothing about timeouts; callers bound their waits.
pub struct SignalRegistry<K = CorrelationKey> {
    signals: Mutex<HashMap<K, SignalHandle>>,
}

impl<K: Eq + Hash + Clone> SignalRegistry<K> {
    pub fn new() -> Self {
        Self {
            signals: Mutex::new(HashMap::new()),
        }
    }

    /// Return the signal for `key`, creating it if absent.
    pub fn get_or_create(&self, key: &K) -> SignalHandle {
        // Handles are plain Arcs, so a poisoned map is still consistent.
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        signals.entry(key.clone()).or_default().clone()
    }

    pub fn signal(&self, key: &K) {
        self.get_or_create(key).signal();
    }

    pub async fn wait(&self, key: &K) {
        let handle = self.get_or_create(key);
        handle.wait().await;
    }

    pub fn contains(&self, key: &K) -> bool {
        let signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        signals.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for SignalRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
