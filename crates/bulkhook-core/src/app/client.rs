//! BulkOperationClient - submit → 通知待ち → status 確認 → download
//!
//! # 流れ
//! 1. テナントの FetchGate を取る（`wait_timeout` まで）
//! 2. submit。失敗・userErrors はその場で返す（待たない）
//! 3. 完了通知を待つ（`wait_timeout` まで）
//! 4. `current_status` を 1 回だけ確認
//!    - FAILED / CANCELED / EXPIRED → エラー
//!    - まだ実行中・status なし・別 operation の status → 早すぎる wake、3 に戻る
//!    - COMPLETED → 結果ファイルを開いて RecordStream を返す
//!
//! タイマーによるポーリングはしない。待機は bridge の 1 か所だけ。
//! gate は RecordStream が終わる（または drop される）まで保持される。

use std::sync::Arc;

use futures::Stream;
use tokio::time::timeout;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::decode::NdjsonDecoder;
use crate::domain::{
    BulkOperationId, BulkOperationState, BulkOperationStatus, BulkQuery, DecodedRecord, FetchError,
    FetchId, FetchPhase, FetchPolicy, SubmissionError, SubmittedOperation, TenantId, TimeoutReason,
};
use crate::notify::{FetchGate, GatePermit, NotificationBridge};
use crate::observability::FetchSummary;
use crate::ports::{BulkTransport, ByteStream, IdGenerator};

/// Runs bulk queries for one tenant.
///
/// Built by [`Coordinator::client`](super::Coordinator::client) so that it
/// shares the signal registry with the webhook ingress.
pub struct BulkOperationClient<T> {
    tenant: TenantId,
    transport: T,
    bridge: NotificationBridge,
    gate: Arc<FetchGate>,
    policy: FetchPolicy,
    ids: Arc<dyn IdGenerator>,
}

impl<T: BulkTransport> BulkOperationClient<T> {
    pub fn new(
        tenant: TenantId,
        transport: T,
        bridge: NotificationBridge,
        gate: Arc<FetchGate>,
        policy: FetchPolicy,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            tenant,
            transport,
            bridge,
            gate,
            policy,
            ids,
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run `query` remotely and return its results as a lazy record stream.
    pub async fn fetch(&self, query: &BulkQuery) -> Result<RecordStream, FetchError> {
        let fetch_id = self.ids.generate_fetch_id();
        let span = info_span!("bulk_fetch", %fetch_id, tenant = %self.tenant);
        self.run(fetch_id, query, span.clone())
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        fetch_id: FetchId,
        query: &BulkQuery,
        span: Span,
    ) -> Result<RecordStream, FetchError> {
        let mut summary = FetchSummary::new(fetch_id, self.tenant.clone());

        let result = self.drive(query, &mut summary).await;
        match result {
            Ok((status, source, permit)) => {
                info!(
                    operation = %status.id,
                    objects = status.object_count,
                    status_checks = summary.status_checks,
                    "bulk operation completed"
                );
                Ok(RecordStream {
                    decoder: source.map(NdjsonDecoder::new),
                    permit: Some(permit),
                    status,
                    summary,
                    span,
                })
            }
            Err(e) => {
                summary.advance(FetchPhase::Failed);
                warn!(error = %e, status_checks = summary.status_checks, "bulk fetch failed");
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        query: &BulkQuery,
        summary: &mut FetchSummary,
    ) -> Result<(BulkOperationStatus, Option<ByteStream>, GatePermit), FetchError> {
        let permit = self.acquire_gate().await?;

        let operation = self.submit(query).await?;
        info!(operation = %operation.id, state = %operation.status, "bulk operation submitted");
        summary.operation_id = Some(operation.id.clone());

        let status = self.await_finished(&operation.id, summary).await?;
        if status.status != BulkOperationState::Completed {
            return Err(FetchError::BulkOperation {
                id: status.id,
                state: status.status,
                code: status.error_code,
            });
        }

        summary.object_count = status.object_count;
        summary.advance(FetchPhase::Downloading);
        let source = match status.url.as_deref() {
            Some(url) => Some(self.transport.download(url).await?),
            None if status.object_count == 0 => {
                debug!(operation = %status.id, "completed without results");
                None
            }
            None => return Err(FetchError::MissingResultUrl(status.id)),
        };

        Ok((status, source, permit))
    }

    async fn acquire_gate(&self) -> Result<GatePermit, FetchError> {
        if let Some(permit) = self.gate.try_acquire(self.bridge.key()) {
            return Ok(permit);
        }
        debug!("another fetch for this tenant is in flight; waiting");
        let waited = self.policy.wait_timeout();
        timeout(waited, self.gate.acquire(self.bridge.key()))
            .await
            .map_err(|_| FetchError::Timeout {
                operation: None,
                reason: TimeoutReason::TenantBusy { waited },
            })
    }

    async fn submit(&self, query: &BulkQuery) -> Result<SubmittedOperation, SubmissionError> {
        let response = self.transport.submit(query).await?;
        if !response.user_errors.is_empty() {
            return Err(SubmissionError::Rejected(response.user_errors));
        }
        response.operation.ok_or(SubmissionError::MissingOperation)
    }

    /// Wait for notifications until the status check shows `operation` in a
    /// terminal state.
    async fn await_finished(
        &self,
        operation: &BulkOperationId,
        summary: &mut FetchSummary,
    ) -> Result<BulkOperationStatus, FetchError> {
        let waited = self.policy.wait_timeout();
        loop {
            summary.advance(FetchPhase::AwaitingNotification);
            if timeout(waited, self.bridge.await_completion()).await.is_err() {
                return Err(FetchError::Timeout {
                    operation: Some(operation.clone()),
                    reason: TimeoutReason::NoNotification { waited },
                });
            }

            let current = self.transport.current_status().await?;
            summary.status_checks += 1;
            summary.advance(FetchPhase::StatusChecked);

            match current {
                Some(status) if &status.id == operation && status.status.is_pending() => {
                    debug!(state = %status.status, "woken before operation finished");
                }
                Some(status) if &status.id == operation => return Ok(status),
                Some(status) => {
                    debug!(current = %status.id, "status belongs to another operation");
                }
                None => debug!("no current bulk operation"),
            }

            summary.spurious_wakes += 1;
            if summary.status_checks >= self.policy.max_status_checks {
                return Err(FetchError::Timeout {
                    operation: Some(operation.clone()),
                    reason: TimeoutReason::StatusChecksExhausted {
                        checks: summary.status_checks,
                    },
                });
            }
            summary.advance(FetchPhase::RetryWait);
        }
    }
}

/// Records of one completed bulk operation, decoded while they are read.
///
/// Holds the tenant's fetch gate until the last record was read, an error was
/// returned, or the stream is dropped.
pub struct RecordStream {
    decoder: Option<NdjsonDecoder<ByteStream>>,
    permit: Option<GatePermit>,
    status: BulkOperationStatus,
    summary: FetchSummary,
    span: Span,
}

impl RecordStream {
    pub async fn next_record(&mut self) -> Option<Result<DecodedRecord, FetchError>> {
        let item = match self.decoder.as_mut() {
            Some(decoder) => decoder.next_record().await,
            None => None,
        };
        match &item {
            Some(Ok(_)) => self.summary.records_yielded += 1,
            Some(Err(_)) => self.finish(FetchPhase::Failed),
            None => self.finish(FetchPhase::Done),
        }
        item.map(|r| r.map_err(FetchError::from))
    }

    fn finish(&mut self, phase: FetchPhase) {
        if self.permit.take().is_none() {
            return;
        }
        let span = self.span.clone();
        span.in_scope(|| {
            self.summary.advance(phase);
            info!(
                records = self.summary.records_yielded,
                phase = %phase,
                "bulk fetch finished"
            );
        });
    }

    /// Final status of the remote operation.
    pub fn operation(&self) -> &BulkOperationStatus {
        &self.status
    }

    pub fn summary(&self) -> &FetchSummary {
        &self.summary
    }

    /// Whether the tenant's gate is still held by this stream.
    pub fn holds_gate(&self) -> bool {
        self.permit.is_some()
    }

    pub async fn collect_records(mut self) -> Result<Vec<DecodedRecord>, FetchError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await {
            records.push(record?);
        }
        Ok(records)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<DecodedRecord, FetchError>> {
        futures::stream::unfold(self, |mut records| async move {
            records.next_record().await.map(|item| (item, records))
        })
    }
}
