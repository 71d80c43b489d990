//! Notify - 待機側（client）と通知側（webhook ingress）のランデブー
//!
//! # 構成
//! - **SignalRegistry**: キーごとの自動リセット単一スロット通知
//! - **NotificationBridge**: 1 テナント分の await/notify
//! - **FetchGate**: 同一テナントの fetch を直列化

pub mod bridge;
pub mod gate;
pub mod registry;

pub use self::bridge::NotificationBridge;
pub use self::gate::{FetchGate, GatePermit};
pub use self::registry::{SignalHandle, SignalRegistry};
