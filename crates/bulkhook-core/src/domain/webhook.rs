//! Payload of the `bulk_operations/finish` callback.
//!
//! The ingress parses it for logging only; the core contract stays
//! `notify_completion(tenant)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{BulkOperationId, BulkOperationState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFinishWebhook {
    pub admin_graphql_api_id: BulkOperationId,

    /// Lowercase in the callback (`completed`, `failed`, ...).
    pub status: String,

    #[serde(default)]
    pub error_code: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// `query` or `mutation`.
    #[serde(default, rename = "type")]
    pub operation_type: Option<String>,
}

impl BulkFinishWebhook {
    /// The reported status mapped onto the GraphQL enum, if recognized.
    pub fn state(&self) -> Option<BulkOperationState> {
        let upper = self.status.to_ascii_uppercase();
        serde_json::from_value(serde_json::Value::String(upper)).ok()
    }
}
