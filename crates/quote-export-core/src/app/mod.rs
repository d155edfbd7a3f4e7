//! App - アプリケーション層
//!
//! ports を組み合わせて 1 回分の export を実装する。
//!
//! # 主要コンポーネント
//! - **QueryExecutor**: 期限付きの読み取りクエリ
//! - **ExportPipeline**: query -> 行ごとに BlobSink へ書き込み
//! - **retry_operation**: Transient なエラーだけ pipeline ごと再実行
//! - **ExportHandler**: invocation の入り口（envelope への変換）

pub mod handler;
pub mod pipeline;
pub mod query;
pub mod retry;

pub use self::handler::{ExportHandler, InvocationReport, handle_from_env};
pub use self::pipeline::{EXPORT_SUMMARY, ExportPipeline};
pub use self::query::{QUOTES_QUERY, QueryExecutor, QueryTimeouts};
pub use self::retry::{RetryPolicy, retry_operation};
