//! Query executor: the single bounded read this job performs.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::{Deadline, ExportError, QuoteRecord};
use crate::ports::{ReadQuery, SessionPool};

/// Statement run on every invocation. Never paginated past this bound.
pub const QUOTES_QUERY: &str = "SELECT id, quote, author FROM Quotes WHERE id <= 10;";

/// Client-side deadlines for the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTimeouts {
    /// Deadline handed to the session for the transaction itself.
    pub transaction: Duration,
    /// Deadline for the whole call, enforced here.
    pub operation: Duration,
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self {
            transaction: Duration::from_secs(2),
            operation: Duration::from_secs(3),
        }
    }
}

/// Runs [`QUOTES_QUERY`] against a session pool under [`QueryTimeouts`].
pub struct QueryExecutor {
    pool: Arc<dyn SessionPool>,
    timeouts: QueryTimeouts,
}

impl QueryExecutor {
    pub fn new(pool: Arc<dyn SessionPool>, timeouts: QueryTimeouts) -> Self {
        Self { pool, timeouts }
    }

    pub fn read_query(&self) -> ReadQuery {
        ReadQuery {
            text: QUOTES_QUERY.to_string(),
            transaction_timeout: self.timeouts.transaction,
        }
    }

    /// Execute the read and return the rows in scan order.
    ///
    /// # Errors
    /// - [`ExportError::DeadlineExceeded`] (transient) when the operation
    ///   deadline passes
    /// - whatever the session pool reports otherwise
    pub async fn fetch_quotes(&self) -> Result<Vec<QuoteRecord>, ExportError> {
        let query = self.read_query();

        let rows = tokio::time::timeout(self.timeouts.operation, self.pool.execute_read(&query))
            .await
            .map_err(|_| ExportError::DeadlineExceeded {
                deadline: Deadline::Operation,
                timeout: self.timeouts.operation,
            })??;

        debug!(rows = rows.len(), "quotes query finished");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::inmem::InMemoryDriver;
    use crate::ports::Driver;
    use async_trait::async_trait;

    struct StalledPool;

    #[async_trait]
    impl SessionPool for StalledPool {
        async fn execute_read(&self, _query: &ReadQuery) -> Result<Vec<QuoteRecord>, ExportError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn fetch_returns_rows_from_pool() {
        let driver = InMemoryDriver::with_quotes(vec![
            QuoteRecord::new(2, "B", "Y"),
            QuoteRecord::new(1, "A", "X"),
        ]);
        let executor = QueryExecutor::new(driver.session_pool(), QueryTimeouts::default());

        let rows = executor.fetch_quotes().await.unwrap();

        // scan order is preserved, not re-sorted
        assert_eq!(rows[0].id, 2);
        assert_eq!(rows[1].id, 1);
        assert_eq!(driver.queries_executed(), 1);
    }

    #[tokio::test]
    async fn read_query_carries_statement_and_transaction_deadline() {
        let executor = QueryExecutor::new(Arc::new(StalledPool), QueryTimeouts::default());
        let q = executor.read_query();
        assert_eq!(q.text, QUOTES_QUERY);
        assert_eq!(q.transaction_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn stalled_query_hits_operation_deadline() {
        let timeouts = QueryTimeouts {
            transaction: Duration::from_millis(5),
            operation: Duration::from_millis(20),
        };
        let executor = QueryExecutor::new(Arc::new(StalledPool), timeouts);

        let err = executor.fetch_quotes().await.unwrap_err();

        assert!(matches!(
            err,
            ExportError::DeadlineExceeded {
                deadline: Deadline::Operation,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }
}
