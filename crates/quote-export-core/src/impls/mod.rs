//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **YdbConnector**: 本番用の Connector / Driver / SessionPool（YDB）
//! - **ObjectStoreSink**: 本番用の BlobSink（S3 互換 object storage）
//! - **InMemoryDriver / InMemoryBlobSink**: 開発用・テスト用

pub mod inmem;
pub mod s3_sink;
pub mod ydb_driver;

pub use self::inmem::{InMemoryBlobSink, InMemoryDriver};
pub use self::s3_sink::ObjectStoreSink;
pub use self::ydb_driver::YdbConnector;
