//! BulkTransport port - リモートプラットフォームへの 3 つのリクエスト
//!
//! # 実装
//! - **ScriptedTransport**: テスト・デモ用（impls::scripted）
//! - **ShopifyTransport**: Admin GraphQL API（impls::shopify）

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::{BulkOperationStatus, BulkQuery, SubmitResponse, TransportError};

/// Streamed body of a result download.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Requests the bulk operation client makes against the remote platform.
///
/// Every call is scoped to the authenticated tenant the transport was built
/// for; the trait itself carries no tenant.
#[async_trait]
pub trait BulkTransport: Send + Sync {
    /// Start a bulk operation for `query`.
    ///
    /// User errors are part of a successful reply; `Err` is reserved for
    /// failures to talk to the platform at all.
    async fn submit(&self, query: &BulkQuery) -> Result<SubmitResponse, TransportError>;

    /// The tenant's current bulk operation, `None` if there is none.
    async fn current_status(&self) -> Result<Option<BulkOperationStatus>, TransportError>;

    /// Open the JSONL result at `url` as a byte stream.
    async fn download(&self, url: &str) -> Result<ByteStream, TransportError>;
}

#[async_trait]
impl<T: BulkTransport + ?Sized> BulkTransport for Arc<T> {
    async fn submit(&self, query: &BulkQuery) -> Result<SubmitResponse, TransportError> {
        (**self).submit(query).await
    }

    async fn current_status(&self) -> Result<Option<BulkOperationStatus>, TransportError> {
        (**self).current_status().await
    }

    async fn download(&self, url: &str) -> Result<ByteStream, TransportError> {
        (**self).download(url).await
    }
}
