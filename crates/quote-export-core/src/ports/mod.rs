//! Ports - 抽象化レイヤー
//!
//! 外部システム（YDB, S3 互換 object storage）へのインターフェース。
//! 本番実装とテスト用実装は `impls` にある。

pub mod blob_sink;
pub mod driver;
pub mod session_pool;

pub use self::blob_sink::BlobSink;
pub use self::driver::{Connector, Driver};
pub use self::session_pool::{ReadQuery, SessionPool};
