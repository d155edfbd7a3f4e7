//! BlobSink port - Object storage への書き込み
//!
//! # 設計原則
//! - 1 key = 1 PUT（途中まで書かれた body は読み手から見えない）
//! - 同じ key は上書き（last writer wins、条件付き書き込みなし）
//! - 個別のリトライはしない（pipeline 全体の retry に任せる）

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{BlobKey, ExportError};

#[async_trait]
pub trait BlobSink: Send + Sync {
    /// Store `body` under `key` in the configured bucket.
    ///
    /// Failures are reported as [`ExportError::Upload`].
    async fn put(&self, key: &BlobKey, body: Bytes) -> Result<(), ExportError>;
}
