use std::hash::Hash;
use std::sync::Arc;

use super::registry::SignalRegistry;
use crate::domain::CorrelationKey;

/// Per-tenant wait/notify facade over the signal registry.
///
/// Exactly two call sites use it: the bulk operation client waits, and the
/// webhook ingress notifies. Contract for the ingress: after verifying a
/// completion callback for tenant T, call `notify_completion` for T exactly
/// once per finished remote job.
#[derive(Clone)]
pub struct NotificationBridge<K = CorrelationKey> {
    registry: Arc<SignalRegistry<K>>,
    key: K,
}

impl<K: Eq + Hash + Clone> NotificationBridge<K> {
    pub fn new(registry: Arc<SignalRegistry<K>>, key: K) -> Self {
        Self { registry, key }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Suspend until the tenant's completion signal is set, then consume it.
    ///
    /// Unbounded; the caller applies the timeout.
    pub async fn await_completion(&self) {
        self.registry.wait(&self.key).await;
    }

    pub fn notify_completion(&self) {
        self.registry.signal(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TenantId;
    use std::time::Duration;
    use tokio::time::timeout;

    fn bridge(registry: &Arc<SignalRegistry>, shop: &str) -> NotificationBridge {
        NotificationBridge::new(registry.clone(), CorrelationKey::from(TenantId::new(shop)))
    }

    #[tokio::test]
    async fn notifier_and_waiter_rendezvous_through_separate_bridges() {
        let registry = Arc::new(SignalRegistry::new());
        let waiter = bridge(&registry, "a.myshopify.com");
        let ingress = bridge(&registry, "a.myshopify.com");

        let task = tokio::spawn(async move { waiter.await_completion().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        ingress.notify_completion();

        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn other_tenant_notification_is_ignored() {
        let registry = Arc::new(SignalRegistry::new());
        let t2 = bridge(&registry, "t2.myshopify.com");
        bridge(&registry, "t1.myshopify.com").notify_completion();

        assert!(
            timeout(Duration::from_millis(100), t2.await_completion())
                .await
                .is_err()
        );
    }

    #[test]
    fn creating_a_bridge_does_not_create_a_signal() {
        let registry = Arc::new(SignalRegistry::new());
        let b = bridge(&registry, "lazy.myshopify.com");

        assert!(registry.is_empty());
        assert_eq!(b.key().tenant().as_str(), "lazy.myshopify.com");
    }
}
