//! State - fetch 1 回分の状態機械
//!
//! # 状態遷移
//! - Submitted -> AwaitingNotification -> StatusChecked -> Downloading -> Done
//! - StatusChecked -> RetryWait -> AwaitingNotification（早すぎる wake）
//! - どこからでも -> Failed

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of one fetch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    Submitted,
    AwaitingNotification,
    StatusChecked,
    RetryWait,
    Downloading,
    Done,
    Failed,
}

impl FetchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: FetchPhase) -> bool {
        use FetchPhase::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Submitted, AwaitingNotification) => true,
            (AwaitingNotification, StatusChecked) => true,
            (StatusChecked, RetryWait | Downloading) => true,
            (RetryWait, AwaitingNotification) => true,
            (Downloading, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::AwaitingNotification => "awaiting_notification",
            Self::StatusChecked => "status_checked",
            Self::RetryWait => "retry_wait",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
