//! Remote bulk operation status as reported by the platform.
//!
//! Transitions are observed, never driven, by this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque remote identifier (`gid://shopify/BulkOperation/<n>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkOperationId(String);

impl BulkOperationId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BulkOperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a bulk operation.
///
/// State transitions (remote):
/// - Created -> Running -> Completed
/// - Created/Running -> Failed
/// - Created/Running -> Canceling -> Canceled
/// - Completed -> Expired (result URL no longer available)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkOperationState {
    Created,
    Running,
    Completed,
    Failed,
    Canceling,
    Canceled,
    Expired,
}

impl BulkOperationState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Canceled | Self::Expired
        )
    }

    /// Still in progress on the remote side.
    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for BulkOperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Canceling => "CANCELING",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// Status of an export job (`currentBulkOperation`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationStatus {
    pub id: BulkOperationId,
    pub status: BulkOperationState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Download URL of the JSONL result, present once `COMPLETED` with data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Partial result of a failed operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_data_url: Option<String>,

    /// The platform encodes counts as `UnsignedInt64` strings.
    #[serde(default, deserialize_with = "count_from_string_or_number")]
    pub object_count: u64,

    #[serde(
        default,
        deserialize_with = "optional_count_from_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BulkOperationStatus {
    /// Minimal status, mostly useful for scripted transports.
    pub fn new(id: BulkOperationId, status: BulkOperationState) -> Self {
        Self {
            id,
            status,
            error_code: None,
            url: None,
            partial_data_url: None,
            object_count: 0,
            file_size: None,
            created_at: None,
            completed_at: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_object_count(mut self, count: u64) -> Self {
        self.object_count = count;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Number(u64),
    Text(String),
}

fn optional_count_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawCount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCount::Number(n)) => Ok(Some(n)),
        Some(RawCount::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn count_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_count_from_string_or_number(deserializer)?.unwrap_or(0))
}
