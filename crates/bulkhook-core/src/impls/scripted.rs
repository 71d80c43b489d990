//! ScriptedTransport - テスト・デモ用の BulkTransport
//!
//! # 学習ポイント
//! - 返答を事前に積んでおき、呼ばれた順に返す（最後の 1 つは繰り返す）
//! - `Arc<Mutex<..>>` で内部状態を共有し、client に渡した後も呼び出し回数を検査できる
//! - download はボディを固定長チャンクに分けて流す（行がチャンク境界をまたぐ）

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::domain::{
    BulkOperationId, BulkOperationState, BulkOperationStatus, BulkQuery, SubmitResponse,
    TransportError, UserError,
};
use crate::ports::{BulkTransport, ByteStream};

const DEFAULT_CHUNK_SIZE: usize = 7;

#[derive(Default)]
struct ScriptState {
    submission: Option<Result<SubmitResponse, String>>,
    statuses: VecDeque<Option<BulkOperationStatus>>,
    bodies: HashMap<String, Bytes>,
    submitted_queries: Vec<BulkQuery>,
    status_checks: usize,
    downloads: usize,
}

/// In-memory transport returning pre-scripted replies.
#[derive(Clone)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
    chunk_size: usize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState::default())),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Accept submissions and report operation `id` as `CREATED`.
    pub fn accepting(id: impl Into<String>) -> Self {
        Self::new().with_submission(SubmitResponse::accepted(BulkOperationId::new(id)))
    }

    pub fn with_submission(self, response: SubmitResponse) -> Self {
        self.state().submission = Some(Ok(response));
        self
    }

    pub fn rejecting(self, message: impl Into<String>) -> Self {
        let response = SubmitResponse::rejected(vec![UserError {
            field: Some(vec!["query".to_string()]),
            message: message.into(),
        }]);
        self.with_submission(response)
    }

    /// Make submission fail at the transport level.
    pub fn unreachable(self, message: impl Into<String>) -> Self {
        self.state().submission = Some(Err(message.into()));
        self
    }

    /// Queue the reply of the next status check.
    pub fn then_status(self, status: BulkOperationStatus) -> Self {
        self.state().statuses.push_back(Some(status));
        self
    }

    /// Queue a status check that finds no current operation.
    pub fn then_no_operation(self) -> Self {
        self.state().statuses.push_back(None);
        self
    }

    pub fn then_state(self, id: impl Into<String>, state: BulkOperationState) -> Self {
        self.then_status(BulkOperationStatus::new(BulkOperationId::new(id), state))
    }

    pub fn serving(self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.state().bodies.insert(url.into(), body.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn submissions(&self) -> usize {
        self.state().submitted_queries.len()
    }

    pub fn submitted_queries(&self) -> Vec<BulkQuery> {
        self.state().submitted_queries.clone()
    }

    pub fn status_checks(&self) -> usize {
        self.state().status_checks
    }

    pub fn downloads(&self) -> usize {
        self.state().downloads
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BulkTransport for ScriptedTransport {
    async fn submit(&self, query: &BulkQuery) -> Result<SubmitResponse, TransportError> {
        let mut state = self.state();
        state.submitted_queries.push(query.clone());
        match &state.submission {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(TransportError::Unavailable(message.clone())),
            None => Err(TransportError::Unavailable(
                "no submission reply scripted".to_string(),
            )),
        }
    }

    async fn current_status(&self) -> Result<Option<BulkOperationStatus>, TransportError> {
        let mut state = self.state();
        state.status_checks += 1;
        let reply = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };
        reply.ok_or_else(|| TransportError::Unavailable("no status reply scripted".to_string()))
    }

    async fn download(&self, url: &str) -> Result<ByteStream, TransportError> {
        let body = {
            let mut state = self.state();
            state.downloads += 1;
            state.bodies.get(url).cloned()
        };
        let body = body.ok_or_else(|| TransportError::Status {
            status: 404,
            body: format!("nothing served at {url}"),
        })?;

        let chunks: Vec<Result<Bytes, TransportError>> = body
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(futures::stream::iter(chunks).boxed())
    }
}
