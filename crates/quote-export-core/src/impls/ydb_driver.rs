//! YDB adapter - Connector / Driver / SessionPool の本番実装
//!
//! 認証はインスタンスの metadata service から取る（静的な鍵は使わない）。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use ydb::{
    ClientBuilder, MetadataUrlCredentials, Query, TableClient, YdbError, YdbOrCustomerError,
    YdbResult,
};

use crate::config::DatabaseConfig;
use crate::domain::{Deadline, ErrorKind, ExportError, QuoteRecord};
use crate::ports::{Connector, Driver, ReadQuery, SessionPool};

/// Creates a YDB client per invocation.
pub struct YdbConnector {
    config: DatabaseConfig,
}

impl YdbConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for YdbConnector {
    async fn connect(&self) -> Result<Arc<dyn Driver>, ExportError> {
        let connection_string = self.config.connection_string();
        let client = ClientBuilder::new_from_connection_string(&connection_string)
            .map_err(|e| ExportError::Configuration(format!("ydb connection string: {e}")))?
            .with_credentials(MetadataUrlCredentials::new())
            .client()
            .map_err(|e| ExportError::Connectivity(e.to_string()))?;

        debug!(
            endpoint = %self.config.endpoint,
            database = %self.config.database,
            "ydb client created"
        );
        Ok(Arc::new(YdbDriver { client }))
    }
}

pub struct YdbDriver {
    client: ydb::Client,
}

#[async_trait]
impl Driver for YdbDriver {
    async fn wait_ready(&self) -> Result<(), ExportError> {
        self.client
            .wait()
            .await
            .map_err(|e| ExportError::Connectivity(e.to_string()))
    }

    fn session_pool(&self) -> Arc<dyn SessionPool> {
        Arc::new(YdbSessionPool {
            table: self.client.table_client(),
        })
    }
}

/// Session pool backed by the SDK's table client.
///
/// `retry_transaction` takes a pooled session, runs the callback and retries
/// on session-level failures by itself; the transaction deadline bounds all
/// of that together.
pub struct YdbSessionPool {
    table: TableClient,
}

#[async_trait]
impl SessionPool for YdbSessionPool {
    async fn execute_read(&self, query: &ReadQuery) -> Result<Vec<QuoteRecord>, ExportError> {
        let text = query.text.clone();

        let transaction = self.table.retry_transaction(move |mut t| {
            let text = text.clone();
            async move {
                let result = t.query(Query::new(text)).await?;
                // read-only, but the transaction must still be closed
                t.commit().await?;

                let mut records = Vec::new();
                for row in result.into_only_result()?.rows() {
                    records.push(row_to_record(row)?);
                }
                Ok(records)
            }
        });

        tokio::time::timeout(query.transaction_timeout, transaction)
            .await
            .map_err(|_| ExportError::DeadlineExceeded {
                deadline: Deadline::Transaction,
                timeout: query.transaction_timeout,
            })?
            .map_err(from_transaction_error)
    }
}

fn row_to_record(mut row: ydb::Row) -> YdbResult<QuoteRecord> {
    let id = id_from_value(row.remove_field_by_name("id")?)?;
    let quote: Option<String> = row.remove_field_by_name("quote")?.try_into()?;
    let author: Option<String> = row.remove_field_by_name("author")?.try_into()?;

    record_from_columns(id, quote, author)
}

/// `id` may be any integer column, signed or not.
fn id_from_value(value: ydb::Value) -> YdbResult<Option<i64>> {
    if let Ok(id) = Option::<i64>::try_from(value.clone()) {
        return Ok(id);
    }

    let id: Option<u64> = value.try_into()?;
    id.map(|v| {
        i64::try_from(v).map_err(|_| YdbError::Custom(format!("Quotes.id {v} is out of range")))
    })
    .transpose()
}

fn record_from_columns(
    id: Option<i64>,
    quote: Option<String>,
    author: Option<String>,
) -> YdbResult<QuoteRecord> {
    let id = id.ok_or_else(|| YdbError::Custom("Quotes.id is NULL".to_string()))?;

    // NULL text columns export as empty strings rather than failing the row
    Ok(QuoteRecord::new(
        id,
        quote.unwrap_or_default(),
        author.unwrap_or_default(),
    ))
}

/// Transport failures (dial, dropped stream, gRPC status) are worth another
/// attempt. Status errors from the server (scheme, auth, bad query) are not.
fn classify(err: &YdbError) -> ErrorKind {
    match err {
        YdbError::Transport(_) | YdbError::TransportDial(_) | YdbError::TransportGRPCStatus(_) => {
            ErrorKind::Transient
        }
        _ => ErrorKind::Fatal,
    }
}

fn from_transaction_error(err: YdbOrCustomerError) -> ExportError {
    match err {
        YdbOrCustomerError::YDB(e) => ExportError::Database {
            kind: classify(&e),
            message: e.to_string(),
        },
        YdbOrCustomerError::Customer(e) => ExportError::fatal_database(e.to_string()),
    }
}
