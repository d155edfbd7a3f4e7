//! quote-export-core
//!
//! Exports the first ten rows of the YDB `Quotes` table to an S3-compatible
//! bucket, one object per row (`quote-{id}.txt`).
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（QuoteRecord, BlobKey, ResponseEnvelope, ExportError, InvocationState）
//! - **ports**: 抽象化レイヤー（Connector, Driver, SessionPool, BlobSink）
//! - **app**: アプリケーションロジック（QueryExecutor, ExportPipeline, retry, ExportHandler）
//! - **impls**: 実装（YDB, object storage, InMemory）
//! - **config**: 環境変数からの設定
//! - **observability**: tracing の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{ExportHandler, handle_from_env};
pub use config::ExportConfig;
pub use domain::{ExportError, InvocationContext, ResponseEnvelope};
