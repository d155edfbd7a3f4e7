//! ExportHandler - invocation の入り口
//!
//! 1 回の呼び出しで:
//! 1. Connector で driver を作る
//! 2. driver が ready になるのを期限付きで待つ（超えたら query は一切流さない）
//! 3. session pool を取り、pipeline を retry wrapper 越しに実行
//! 4. 結果を ResponseEnvelope に変換（エラーは外に漏らさない）

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, error, info, info_span};

use super::pipeline::ExportPipeline;
use super::query::{QueryExecutor, QueryTimeouts};
use super::retry::{RetryPolicy, retry_operation};
use crate::config::ExportConfig;
use crate::domain::{
    Deadline, ExportError, InvocationContext, InvocationState, ResponseEnvelope,
};
use crate::impls::{ObjectStoreSink, YdbConnector};
use crate::ports::{BlobSink, Connector};

/// What happened during one invocation.
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub envelope: ResponseEnvelope,
    /// Every state entered, starting with `Init`.
    pub states: Vec<InvocationState>,
    /// Pipeline runs started (0 when the driver never became ready).
    pub attempts: u32,
}

struct StateLog {
    states: Vec<InvocationState>,
}

impl StateLog {
    fn new() -> Self {
        Self {
            states: vec![InvocationState::Init],
        }
    }

    fn current(&self) -> InvocationState {
        self.states
            .last()
            .copied()
            .unwrap_or(InvocationState::Init)
    }

    fn advance(&mut self, next: InvocationState) {
        let from = self.current();
        debug_assert!(from.can_transition_to(next), "{from:?} -> {next:?}");
        debug!(?from, to = ?next, "invocation state");
        self.states.push(next);
    }
}

pub struct ExportHandler {
    connector: Arc<dyn Connector>,
    sink: Arc<dyn BlobSink>,
    retry: RetryPolicy,
    ready_timeout: Duration,
    query_timeouts: QueryTimeouts,
}

impl ExportHandler {
    pub fn new(connector: Arc<dyn Connector>, sink: Arc<dyn BlobSink>) -> Self {
        Self {
            connector,
            sink,
            retry: RetryPolicy::default_v1(),
            ready_timeout: Duration::from_secs(5),
            query_timeouts: QueryTimeouts::default(),
        }
    }

    /// Production wiring: YDB for reads, S3-compatible storage for writes.
    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        let connector = Arc::new(YdbConnector::new(config.database.clone()));
        let sink = Arc::new(ObjectStoreSink::from_config(&config.storage)?);

        Ok(Self::new(connector, sink)
            .with_retry_policy(config.retry.clone())
            .with_ready_timeout(config.database.ready_timeout)
            .with_query_timeouts(config.database.query_timeouts))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_query_timeouts(mut self, timeouts: QueryTimeouts) -> Self {
        self.query_timeouts = timeouts;
        self
    }

    /// Platform entry point. Always returns a well-formed envelope.
    pub async fn handle(
        &self,
        event: &serde_json::Value,
        ctx: &InvocationContext,
    ) -> ResponseEnvelope {
        self.invoke(event, ctx).await.envelope
    }

    /// Same as [`ExportHandler::handle`], keeping the state trail.
    pub async fn invoke(
        &self,
        event: &serde_json::Value,
        ctx: &InvocationContext,
    ) -> InvocationReport {
        let span = info_span!(
            "invocation",
            request_id = %ctx.request_id,
            function = ctx.function_name.as_deref().unwrap_or("-"),
        );

        async {
            debug!(%event, "invocation received");

            let mut log = StateLog::new();
            let mut attempts = 0;
            let result = self.run(&mut log, &mut attempts).await;

            let envelope = match result {
                Ok(summary) => {
                    info!(attempts, "export succeeded");
                    ResponseEnvelope::ok(summary)
                }
                Err(err) => {
                    error!(attempts, error = %err, kind = ?err.kind(), "export failed");
                    ResponseEnvelope::failure(&err)
                }
            };

            InvocationReport {
                envelope,
                states: log.states,
                attempts,
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, log: &mut StateLog, attempts: &mut u32) -> Result<String, ExportError> {
        log.advance(InvocationState::DriverConnecting);
        let driver = match self.connector.connect().await {
            Ok(driver) => driver,
            Err(err) => {
                log.advance(InvocationState::DriverFailed);
                return Err(err);
            }
        };

        let ready = tokio::time::timeout(self.ready_timeout, driver.wait_ready())
            .await
            .map_err(|_| ExportError::DeadlineExceeded {
                deadline: Deadline::DriverReady,
                timeout: self.ready_timeout,
            })
            .and_then(|r| r);
        if let Err(err) = ready {
            log.advance(InvocationState::DriverFailed);
            return Err(err);
        }
        log.advance(InvocationState::DriverReady);

        let executor = QueryExecutor::new(driver.session_pool(), self.query_timeouts);
        let pipeline = ExportPipeline::new(Arc::clone(&self.sink));

        let result = {
            let (pipeline, executor) = (&pipeline, &executor);
            let (trail, started) = (&mut *log, &mut *attempts);

            retry_operation(&self.retry, move |attempt| {
                if attempt > 1 {
                    trail.advance(InvocationState::PipelineRetrying);
                }
                trail.advance(InvocationState::PipelineRunning);
                *started = attempt;
                pipeline.run(executor)
            })
            .await
        };

        match &result {
            Ok(_) => log.advance(InvocationState::PipelineSucceeded),
            Err(_) => log.advance(InvocationState::PipelineFailed),
        }
        result
    }
}

/// Build everything from the process environment and run one invocation.
///
/// Configuration problems come back as a failure envelope like any other
/// error.
pub async fn handle_from_env(
    event: &serde_json::Value,
    ctx: &InvocationContext,
) -> ResponseEnvelope {
    let handler = match ExportConfig::from_env().and_then(|cfg| ExportHandler::from_config(&cfg)) {
        Ok(handler) => handler,
        Err(err) => {
            error!(request_id = %ctx.request_id, error = %err, "invalid configuration");
            return ResponseEnvelope::failure(&err);
        }
    };

    handler.handle(event, ctx).await
}

#[cfg(test)]
mod tests {
    use super::InvocationState::*;
    use super::*;
    use crate::app::pipeline::EXPORT_SUMMARY;
    use crate::domain::{ErrorKind, QuoteRecord};
    use crate::impls::{InMemoryBlobSink, InMemoryDriver};
    use async_trait::async_trait;
    use serde_json::json;

    fn three_quotes() -> Vec<QuoteRecord> {
        vec![
            QuoteRecord::new(1, "A", "X"),
            QuoteRecord::new(2, "B", "Y"),
            QuoteRecord::new(3, "C", "Z"),
        ]
    }

    fn handler(driver: &InMemoryDriver, sink: &Arc<InMemoryBlobSink>) -> ExportHandler {
        ExportHandler::new(Arc::new(driver.clone()), sink.clone())
            .with_retry_policy(RetryPolicy::immediate(2))
    }

    #[tokio::test]
    async fn exports_three_rows_end_to_end() {
        let driver = InMemoryDriver::with_quotes(three_quotes());
        let sink = Arc::new(InMemoryBlobSink::new());

        let env = handler(&driver, &sink)
            .handle(&json!({}), &InvocationContext::default())
            .await;

        assert_eq!(env, ResponseEnvelope::ok(EXPORT_SUMMARY));
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"statusCode": 200, "body": "Ten quotes are recorded to the object storage"})
        );

        let objects = sink.objects().await;
        assert_eq!(objects.len(), 3);
        assert_eq!(&objects["quote-1.txt"][..], b"A X");
        assert_eq!(&objects["quote-2.txt"][..], b"B Y");
        assert_eq!(&objects["quote-3.txt"][..], b"C Z");
    }

    #[tokio::test]
    async fn second_invocation_overwrites_same_keys() {
        let driver = InMemoryDriver::with_quotes(three_quotes());
        let sink = Arc::new(InMemoryBlobSink::new());
        let handler = handler(&driver, &sink);

        handler.handle(&json!({}), &InvocationContext::default()).await;
        let first = sink.objects().await;
        handler.handle(&json!({}), &InvocationContext::default()).await;
        let second = sink.objects().await;

        assert_eq!(first, second);
        assert_eq!(sink.write_log().await.len(), 6);
    }

    #[tokio::test]
    async fn driver_not_ready_skips_the_session_pool() {
        let driver = InMemoryDriver::with_quotes(three_quotes()).never_ready();
        let sink = Arc::new(InMemoryBlobSink::new());

        let report = handler(&driver, &sink)
            .with_ready_timeout(Duration::from_millis(20))
            .invoke(&json!({}), &InvocationContext::default())
            .await;

        assert_eq!(report.envelope.status_code, 404);
        assert!(report.envelope.body.contains("driver ready wait"));
        assert_eq!(report.states, vec![Init, DriverConnecting, DriverFailed]);
        assert_eq!(report.attempts, 0);
        assert_eq!(driver.session_pool_requests(), 0);
        assert_eq!(driver.queries_executed(), 0);
        assert!(sink.write_log().await.is_empty());
    }

    #[tokio::test]
    async fn failed_upload_returns_404_and_stops_later_rows() {
        let quotes: Vec<_> = (1..=10)
            .map(|id| QuoteRecord::new(id, format!("q{id}"), format!("a{id}")))
            .collect();
        let driver = InMemoryDriver::with_quotes(quotes);
        let sink = Arc::new(InMemoryBlobSink::new());
        sink.fail_on("quote-5.txt", ErrorKind::Fatal).await;

        let report = handler(&driver, &sink)
            .invoke(&json!({}), &InvocationContext::default())
            .await;

        assert_eq!(report.envelope.status_code, 404);
        assert!(report.envelope.body.contains("quote-5.txt"));
        assert_eq!(report.attempts, 1);
        let log = sink.write_log().await;
        assert_eq!(log.last().map(String::as_str), Some("quote-5.txt"));
        assert!(!log.iter().any(|k| k == "quote-6.txt"));
    }

    #[tokio::test]
    async fn transient_upload_failure_reruns_whole_pipeline() {
        let driver = InMemoryDriver::with_quotes(three_quotes());
        let sink = Arc::new(InMemoryBlobSink::new());
        sink.fail_once_on("quote-2.txt", ErrorKind::Transient).await;

        let report = handler(&driver, &sink)
            .invoke(&json!({}), &InvocationContext::default())
            .await;

        assert!(report.envelope.is_success());
        assert_eq!(report.attempts, 2);
        assert_eq!(driver.queries_executed(), 2);
        assert_eq!(
            sink.write_log().await,
            vec!["quote-1.txt", "quote-2.txt", "quote-1.txt", "quote-2.txt", "quote-3.txt"]
        );
        assert_eq!(
            report.states,
            vec![
                Init,
                DriverConnecting,
                DriverReady,
                PipelineRunning,
                PipelineRetrying,
                PipelineRunning,
                PipelineSucceeded,
            ]
        );
    }

    #[tokio::test]
    async fn transient_query_failure_is_retried_once_then_reported() {
        let driver = InMemoryDriver::with_quotes(three_quotes());
        driver.fail_queries(ErrorKind::Transient);
        let sink = Arc::new(InMemoryBlobSink::new());

        let report = handler(&driver, &sink)
            .invoke(&json!({}), &InvocationContext::default())
            .await;

        assert_eq!(report.envelope.status_code, 404);
        assert_eq!(report.envelope.body, "database error: session lost");
        assert_eq!(driver.queries_executed(), 2);
        assert_eq!(report.states.last(), Some(&PipelineFailed));
    }

    #[tokio::test]
    async fn fatal_query_failure_is_not_retried() {
        let driver = InMemoryDriver::with_quotes(three_quotes());
        driver.fail_queries(ErrorKind::Fatal);
        let sink = Arc::new(InMemoryBlobSink::new());

        let report = handler(&driver, &sink)
            .invoke(&json!({}), &InvocationContext::default())
            .await;

        assert_eq!(report.envelope.status_code, 404);
        assert_eq!(driver.queries_executed(), 1);
        assert_eq!(report.attempts, 1);
    }

    struct RefusingConnector;

    #[async_trait]
    impl Connector for RefusingConnector {
        async fn connect(&self) -> Result<Arc<dyn crate::ports::Driver>, ExportError> {
            Err(ExportError::Connectivity("dns lookup failed".to_string()))
        }
    }

    #[tokio::test]
    async fn connector_failure_becomes_envelope() {
        let sink = Arc::new(InMemoryBlobSink::new());
        let report = ExportHandler::new(Arc::new(RefusingConnector), sink)
            .invoke(&json!({"trigger": "timer"}), &InvocationContext::new("req-1"))
            .await;

        assert_eq!(
            report.envelope,
            ResponseEnvelope {
                status_code: 404,
                body: "database driver is not ready: dns lookup failed".to_string(),
            }
        );
        assert_eq!(report.states, vec![Init, DriverConnecting, DriverFailed]);
    }
}
