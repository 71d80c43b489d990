//! Errors - エラー型と分類
//!
//! `fetch` の呼び出し元にはすべて `FetchError` として届きます。
//! コア内で自動リトライするのは、早すぎる wake を吸収する
//! status check ループだけです。

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::query::UserError;
use super::status::{BulkOperationId, BulkOperationState};

/// Failure talking to the remote platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected http status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("graphql error: {0}")]
    GraphQl(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// The submission was refused; nothing was started remotely.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("query rejected: {}", join_user_errors(.0))]
    Rejected(Vec<UserError>),

    #[error("submission reply carried no bulk operation")]
    MissingOperation,
}

fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Which bound was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutReason {
    /// Another fetch for the same tenant held the gate for the whole wait.
    TenantBusy { waited: Duration },
    /// No completion notification arrived in time.
    NoNotification { waited: Duration },
    /// Woken repeatedly but the operation never reached a terminal state.
    StatusChecksExhausted { checks: u32 },
}

impl fmt::Display for TimeoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenantBusy { waited } => {
                write!(f, "tenant busy with another fetch for {waited:?}")
            }
            Self::NoNotification { waited } => {
                write!(f, "no completion notification within {waited:?}")
            }
            Self::StatusChecksExhausted { checks } => {
                write!(f, "operation still pending after {checks} status checks")
            }
        }
    }
}

/// Error returned by `BulkOperationClient::fetch` and the record stream.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),

    #[error("bulk operation {id} ended as {state} (error code: {})", .code.as_deref().unwrap_or("none"))]
    BulkOperation {
        id: BulkOperationId,
        state: BulkOperationState,
        code: Option<String>,
    },

    #[error("timed out{}: {reason}", .operation.as_ref().map(|id| format!(" waiting for {id}")).unwrap_or_default())]
    Timeout {
        operation: Option<BulkOperationId>,
        reason: TimeoutReason,
    },

    #[error("malformed record at line {line_number}: {raw_line}")]
    MalformedRecord {
        line_number: u64,
        raw_line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("bulk operation {0} completed with objects but without a result url")]
    MissingResultUrl(BulkOperationId),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_operation_error_carries_code() {
        let err = FetchError::BulkOperation {
            id: BulkOperationId::new("op-1"),
            state: BulkOperationState::Failed,
            code: Some("ACCESS_DENIED".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "bulk operation op-1 ended as FAILED (error code: ACCESS_DENIED)"
        );
    }

    #[test]
    fn timeout_message_names_operation_when_known() {
        let err = FetchError::Timeout {
            operation: Some(BulkOperationId::new("op-2")),
            reason: TimeoutReason::StatusChecksExhausted { checks: 3 },
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "timed out waiting for op-2: operation still pending after 3 status checks"
        );

        let err = FetchError::Timeout {
            operation: None,
            reason: TimeoutReason::TenantBusy {
                waited: Duration::from_secs(1),
            },
        };
        assert_eq!(err.to_string(), "timed out: tenant busy with another fetch for 1s");
    }

    #[test]
    fn rejected_submission_lists_user_errors() {
        let err = SubmissionError::Rejected(vec![
            UserError {
                field: Some(vec!["query".to_string()]),
                message: "Invalid".to_string(),
            },
            UserError {
                field: None,
                message: "Busy".to_string(),
            },
        ]);
        assert_eq!(err.to_string(), "query rejected: query: Invalid; Busy");
    }
}
