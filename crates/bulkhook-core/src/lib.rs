//! bulkhook-core
//!
//! Webhook 駆動の bulk operation 取り込み。
//! クエリを submit し、完了 webhook が届くまでタスクを眠らせ、結果の JSONL を
//! ストリームで読みます。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, tenant, status, query, record, state, policy, errors）
//! - **ports**: 抽象化レイヤー（BulkTransport, Clock, IdGenerator）
//! - **notify**: 待機と通知のランデブー（SignalRegistry, NotificationBridge, FetchGate）
//! - **decode**: JSONL のストリーミングデコーダ
//! - **app**: fetch の流れ（Coordinator, BulkOperationClient, RecordStream）
//! - **impls**: 実装（ShopifyTransport, ScriptedTransport）
//! - **observability**: fetch の要約（FetchSummary）

pub mod app;
pub mod decode;
pub mod domain;
pub mod impls;
pub mod notify;
pub mod observability;
pub mod ports;

pub use app::{BulkOperationClient, Coordinator, RecordStream};
pub use domain::{BulkQuery, DecodedRecord, FetchError, FetchPolicy, TenantId};
