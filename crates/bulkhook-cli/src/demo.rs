//! オフラインのデモ: ScriptedTransport + 遅れて届く完了通知

use std::time::Duration;

use bulkhook_core::domain::{BulkOperationId, BulkOperationState, BulkOperationStatus};
use bulkhook_core::impls::ScriptedTransport;
use bulkhook_core::{BulkQuery, Coordinator, FetchPolicy, TenantId};
use serde_json::json;
use tracing::info;

use crate::cli::DemoArgs;

const DEMO_SHOP: &str = "demo.myshopify.com";
const DEMO_OPERATION: &str = "gid://shopify/BulkOperation/1";
const DEMO_URL: &str = "mem://demo/bulk-result.jsonl";

fn result_body(records: u32) -> String {
    (1..=records)
        .map(|n| {
            json!({ "id": format!("gid://shopify/Product/{n}"), "title": format!("Product {n}") })
                .to_string()
                + "\n"
        })
        .collect()
}

fn scripted(args: &DemoArgs) -> ScriptedTransport {
    let id = BulkOperationId::new(DEMO_OPERATION);
    let mut transport = ScriptedTransport::accepting(DEMO_OPERATION);
    for _ in 0..args.spurious_wakes {
        transport = transport.then_state(DEMO_OPERATION, BulkOperationState::Running);
    }
    transport
        .then_status(
            BulkOperationStatus::new(id, BulkOperationState::Completed)
                .with_url(DEMO_URL)
                .with_object_count(u64::from(args.records)),
        )
        .serving(DEMO_URL, result_body(args.records))
}

pub async fn run(args: DemoArgs) -> anyhow::Result<()> {
    let policy: FetchPolicy = args.policy.clone().into();
    let coordinator = Coordinator::new(policy);
    let tenant = TenantId::new(DEMO_SHOP);
    let client = coordinator.client(tenant.clone(), scripted(&args));

    // webhook が (spurious_wakes + 1) 回届く
    let notifier = tokio::spawn({
        let coordinator = coordinator.clone();
        let tenant = tenant.clone();
        let delay = Duration::from_millis(args.notify_delay_ms);
        let deliveries = args.spurious_wakes + 1;
        async move {
            for _ in 0..deliveries {
                tokio::time::sleep(delay).await;
                coordinator.notify_completion(&tenant);
            }
        }
    });

    let mut stream = client.fetch(&BulkQuery::products()).await?;
    while let Some(record) = stream.next_record().await {
        println!("{}", record?.as_value());
    }
    notifier.abort();

    info!("demo finished");
    println!("{}", serde_json::to_string_pretty(stream.summary())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_body_has_one_line_per_record() {
        let body = result_body(3);
        assert_eq!(body.lines().count(), 3);
        assert!(body.ends_with('\n'));
    }
}
