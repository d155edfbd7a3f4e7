//! Export pipeline: query once, then write each row to storage in order.

use std::sync::Arc;

use tracing::info;

use super::query::QueryExecutor;
use crate::domain::{ExportError, ExportUnit};
use crate::ports::BlobSink;

/// Summary returned on success.
///
/// Fixed text, independent of how many rows were actually exported.
pub const EXPORT_SUMMARY: &str = "Ten quotes are recorded to the object storage";

pub struct ExportPipeline {
    sink: Arc<dyn BlobSink>,
}

impl ExportPipeline {
    pub fn new(sink: Arc<dyn BlobSink>) -> Self {
        Self { sink }
    }

    /// Run one full export.
    ///
    /// Rows are written one at a time; the next row is not touched until the
    /// previous write returned. The first failed write aborts the run.
    pub async fn run(&self, executor: &QueryExecutor) -> Result<String, ExportError> {
        let rows = executor.fetch_quotes().await?;

        let mut written = 0usize;
        for record in &rows {
            let (key, body) = ExportUnit::from_record(record).into_parts();

            info!(key = %key, bytes = body.len(), "starting upload to object storage");
            self.sink.put(&key, body).await?;
            info!(key = %key, "uploaded");

            written += 1;
        }

        info!(written, "export finished");
        Ok(EXPORT_SUMMARY.to_string())
    }
}
