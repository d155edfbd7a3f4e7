//! SessionPool port - DB セッションの抽象化
//!
//! 1 回の `execute_read` = 1 トランザクション（読み取り後すぐ commit）。

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ExportError, QuoteRecord};

/// A bounded read statement plus the deadline for its transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadQuery {
    pub text: String,
    pub transaction_timeout: Duration,
}

/// Pool of database sessions scoped to one invocation.
///
/// Rows come back in the engine's scan order; callers must not assume they
/// are sorted by id.
#[async_trait]
pub trait SessionPool: Send + Sync {
    async fn execute_read(&self, query: &ReadQuery) -> Result<Vec<QuoteRecord>, ExportError>;
}
