//! Webhook subscription planning.
//!
//! Registration is idempotent: an identical subscription is kept, a
//! subscription for the same topic pointing elsewhere is replaced.

use serde::{Deserialize, Serialize};

/// Topic the platform calls when a bulk operation finishes.
pub const BULK_OPERATIONS_FINISH: &str = "bulk_operations/finish";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: u64,
    pub topic: String,
    pub address: String,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

/// Body of the REST create call.
#[derive(Debug, Clone, Serialize)]
pub struct NewWebhook<'a> {
    pub topic: &'a str,
    pub address: &'a str,
    pub format: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookPlan {
    /// An identical subscription exists.
    Keep { id: u64 },
    /// Nothing registered for the topic.
    Create,
    /// Remove stale subscriptions for the topic, then create.
    Replace { remove: Vec<u64> },
}

pub fn plan_webhook(existing: &[WebhookSubscription], topic: &str, address: &str) -> WebhookPlan {
    let for_topic: Vec<&WebhookSubscription> =
        existing.iter().filter(|w| w.topic == topic).collect();

    if let Some(same) = for_topic.iter().find(|w| w.address == address) {
        return WebhookPlan::Keep { id: same.id };
    }
    if for_topic.is_empty() {
        WebhookPlan::Create
    } else {
        WebhookPlan::Replace {
            remove: for_topic.iter().map(|w| w.id).collect(),
        }
    }
}
