//! Observability - fetch 1 回分の要約
//!
//! 状態遷移は `advance` を通して記録し、同時に tracing の debug イベントを出します。
//! 想定外の遷移は warn を出すだけで処理は止めません。

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{BulkOperationId, FetchId, FetchPhase, TenantId};

#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub fetch_id: FetchId,
    pub tenant: TenantId,
    pub operation_id: Option<BulkOperationId>,
    pub phase: FetchPhase,
    pub status_checks: u32,
    /// Wakes after which the operation was not yet finished.
    pub spurious_wakes: u32,
    /// As reported by the platform; not necessarily equal to the number of
    /// lines (child records are separate lines).
    pub object_count: u64,
    pub records_yielded: u64,
}

impl FetchSummary {
    pub fn new(fetch_id: FetchId, tenant: TenantId) -> Self {
        Self {
            fetch_id,
            tenant,
            operation_id: None,
            phase: FetchPhase::Submitted,
            status_checks: 0,
            spurious_wakes: 0,
            object_count: 0,
            records_yielded: 0,
        }
    }

    pub(crate) fn advance(&mut self, next: FetchPhase) {
        if !self.phase.can_transition_to(next) {
            warn!(from = %self.phase, to = %next, "unexpected fetch phase transition");
        }
        debug!(from = %self.phase, to = %next, "fetch phase");
        self.phase = next;
    }
}
