//! App - アプリケーション層
//!
//! ports と notify を組み合わせて fetch の流れを実装します。
//!
//! # 主要コンポーネント
//! - **Coordinator**: registry / gate / policy をまとめて共有する
//! - **BulkOperationClient**: submit → 通知待ち → status 確認 → download
//! - **RecordStream**: 結果ファイルを 1 行ずつ読むストリーム

pub mod client;
pub mod coordinator;

pub use self::client::{BulkOperationClient, RecordStream};
pub use self::coordinator::Coordinator;
