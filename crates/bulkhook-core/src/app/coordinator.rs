//! Coordinator - プロセス内で共有する配線
//!
//! SignalRegistry と FetchGate をここで 1 つずつ持ち、webhook ingress と
//! リクエストハンドラの両方に clone して渡します。テストでは独立した
//! Coordinator を作れば状態は共有されません。

use std::sync::Arc;

use tracing::info;

use super::client::BulkOperationClient;
use crate::domain::{CorrelationKey, FetchPolicy, TenantId};
use crate::notify::{FetchGate, NotificationBridge, SignalRegistry};
use crate::ports::{BulkTransport, IdGenerator, SystemClock, UlidGenerator};

#[derive(Clone)]
pub struct Coordinator {
    registry: Arc<SignalRegistry>,
    gate: Arc<FetchGate>,
    policy: FetchPolicy,
    ids: Arc<dyn IdGenerator>,
}

impl Coordinator {
    pub fn new(policy: FetchPolicy) -> Self {
        Self {
            registry: Arc::new(SignalRegistry::new()),
            gate: Arc::new(FetchGate::new()),
            policy,
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Arc<SignalRegistry> {
        &self.registry
    }

    pub fn bridge(&self, tenant: &TenantId) -> NotificationBridge {
        NotificationBridge::new(self.registry.clone(), CorrelationKey::from(tenant))
    }

    /// Entry point for the webhook ingress: a bulk operation of `tenant`
    /// finished.
    pub fn notify_completion(&self, tenant: &TenantId) {
        info!(tenant = %tenant, "completion notification received");
        self.bridge(tenant).notify_completion();
    }

    pub fn client<T: BulkTransport>(&self, tenant: TenantId, transport: T) -> BulkOperationClient<T> {
        let bridge = self.bridge(&tenant);
        BulkOperationClient::new(
            tenant,
            transport,
            bridge,
            self.gate.clone(),
            self.policy.clone(),
            self.ids.clone(),
        )
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(FetchPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FetchId;
    use crate::impls::ScriptedTransport;
    use std::time::Duration;
    use ulid::Ulid;

    struct FixedIds;

    impl IdGenerator for FixedIds {
        fn generate_fetch_id(&self) -> FetchId {
            FetchId::from(Ulid::from_parts(1, 42))
        }
    }

    #[tokio::test]
    async fn notification_reaches_client_of_same_coordinator() {
        let coordinator = Coordinator::default();
        let tenant = TenantId::new("a.myshopify.com");
        coordinator.notify_completion(&tenant);

        tokio::time::timeout(
            Duration::from_millis(100),
            coordinator.bridge(&tenant).await_completion(),
        )
        .await
        .expect("signal must be pending");
    }

    #[tokio::test]
    async fn separate_coordinators_do_not_share_signals() {
        let a = Coordinator::default();
        let b = Coordinator::default();
        let tenant = TenantId::new("a.myshopify.com");
        a.notify_completion(&tenant);

        assert!(b.registry().is_empty());
        assert!(
            tokio::time::timeout(Duration::from_millis(50), b.bridge(&tenant).await_completion())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn client_uses_configured_policy_and_ids() {
        let policy = FetchPolicy::new(Duration::from_millis(10), 1);
        let coordinator =
            Coordinator::new(policy.clone()).with_id_generator(Arc::new(FixedIds));
        let tenant = TenantId::new("a.myshopify.com");
        let transport = ScriptedTransport::accepting("op-1").then_state(
            "op-1",
            crate::domain::BulkOperationState::Completed,
        );
        coordinator.notify_completion(&tenant);

        let client = coordinator.client(tenant.clone(), transport);
        assert_eq!(client.policy(), &policy);
        assert_eq!(client.tenant(), &tenant);

        let stream = client.fetch(&crate::domain::BulkQuery::products()).await.unwrap();
        assert_eq!(
            stream.summary().fetch_id,
            FetchId::from(Ulid::from_parts(1, 42))
        );
    }
}
