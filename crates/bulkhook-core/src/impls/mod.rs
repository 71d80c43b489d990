//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ShopifyTransport**: Admin API（GraphQL + REST webhooks）
//! - **ScriptedTransport**: テスト・デモ用に返答を積んでおく実装
//! - **webhooks**: webhook 登録の計画（純粋関数）

pub mod scripted;
pub mod shopify;
pub mod webhooks;

pub use self::scripted::ScriptedTransport;
pub use self::shopify::{ShopifyConfig, ShopifyTransport};
pub use self::webhooks::{BULK_OPERATIONS_FINISH, WebhookPlan, WebhookSubscription, plan_webhook};
