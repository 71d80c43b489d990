//! Ports - 抽象化レイヤー
//!
//! 外部システム（Shopify Admin API, 時刻, ID 生成）へのインターフェースを
//! trait として定義し、実装の詳細を隠蔽します。実装は `impls` にあります。

pub mod clock;
pub mod id_generator;
pub mod transport;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::transport::{BulkTransport, ByteStream};
