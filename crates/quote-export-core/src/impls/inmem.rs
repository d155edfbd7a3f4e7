//! In-memory adapters - 開発用・テスト用
//!
//! - `InMemoryDriver`: 固定の Quotes テーブルを持つ Driver / SessionPool
//! - `InMemoryBlobSink`: key -> body の map と書き込み順のログ
//!
//! どちらも障害注入ができるので、retry / abort の挙動をテストで再現できる。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::domain::{BlobKey, ErrorKind, ExportError, QuoteRecord};
use crate::ports::{BlobSink, Connector, Driver, ReadQuery, SessionPool};

#[derive(Default)]
struct DriverState {
    quotes: Vec<QuoteRecord>,
    never_ready: AtomicBool,
    fatal_queries: AtomicBool,
    transient_failures_left: AtomicU32,
    session_pool_requests: AtomicU32,
    queries_executed: AtomicU32,
}

/// Driver over a fixed quote table.
///
/// Clones share the same table and counters, so a test can keep one handle
/// while the handler owns another.
#[derive(Clone, Default)]
pub struct InMemoryDriver {
    state: Arc<DriverState>,
}

impl InMemoryDriver {
    pub fn with_quotes(quotes: Vec<QuoteRecord>) -> Self {
        Self {
            state: Arc::new(DriverState {
                quotes,
                ..Default::default()
            }),
        }
    }

    /// `wait_ready` never resolves.
    pub fn never_ready(self) -> Self {
        self.state.never_ready.store(true, Ordering::Relaxed);
        self
    }

    /// Every query fails with the given kind.
    pub fn fail_queries(&self, kind: ErrorKind) {
        match kind {
            ErrorKind::Fatal => self.state.fatal_queries.store(true, Ordering::Relaxed),
            ErrorKind::Transient => self
                .state
                .transient_failures_left
                .store(u32::MAX, Ordering::Relaxed),
        }
    }

    /// The next `n` queries fail with a transient error.
    pub fn fail_next_queries(&self, n: u32) {
        self.state.transient_failures_left.store(n, Ordering::Relaxed);
    }

    pub fn session_pool_requests(&self) -> u32 {
        self.state.session_pool_requests.load(Ordering::Relaxed)
    }

    pub fn queries_executed(&self) -> u32 {
        self.state.queries_executed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Driver for InMemoryDriver {
    async fn wait_ready(&self) -> Result<(), ExportError> {
        if self.state.never_ready.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn session_pool(&self) -> Arc<dyn SessionPool> {
        self.state.session_pool_requests.fetch_add(1, Ordering::Relaxed);
        Arc::new(InMemorySessionPool {
            state: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl Connector for InMemoryDriver {
    async fn connect(&self) -> Result<Arc<dyn Driver>, ExportError> {
        Ok(Arc::new(self.clone()))
    }
}

struct InMemorySessionPool {
    state: Arc<DriverState>,
}

#[async_trait]
impl SessionPool for InMemorySessionPool {
    async fn execute_read(&self, _query: &ReadQuery) -> Result<Vec<QuoteRecord>, ExportError> {
        self.state.queries_executed.fetch_add(1, Ordering::Relaxed);

        if self.state.fatal_queries.load(Ordering::Relaxed) {
            return Err(ExportError::fatal_database("table Quotes does not exist"));
        }

        let left = self.state.transient_failures_left.load(Ordering::Relaxed);
        if left > 0 {
            if left != u32::MAX {
                self.state
                    .transient_failures_left
                    .fetch_sub(1, Ordering::Relaxed);
            }
            return Err(ExportError::transient_database("session lost"));
        }

        Ok(self.state.quotes.clone())
    }
}

#[derive(Debug, Clone, Copy)]
struct FailureRule {
    kind: ErrorKind,
    once: bool,
}

#[derive(Default)]
struct SinkState {
    objects: BTreeMap<String, Bytes>,
    write_log: Vec<String>,
    failures: HashMap<String, FailureRule>,
}

/// Bucket held in memory.
///
/// `write_log` records every attempted `put`, including failed ones.
#[derive(Default)]
pub struct InMemoryBlobSink {
    state: Mutex<SinkState>,
}

impl InMemoryBlobSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write to `key` fails with `kind`.
    pub async fn fail_on(&self, key: &str, kind: ErrorKind) {
        self.state
            .lock()
            .await
            .failures
            .insert(key.to_string(), FailureRule { kind, once: false });
    }

    /// The next write to `key` fails with `kind`; later writes succeed.
    pub async fn fail_once_on(&self, key: &str, kind: ErrorKind) {
        self.state
            .lock()
            .await
            .failures
            .insert(key.to_string(), FailureRule { kind, once: true });
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.state.lock().await.objects.get(key).cloned()
    }

    /// Stored objects, ordered by key.
    pub async fn objects(&self) -> BTreeMap<String, Bytes> {
        self.state.lock().await.objects.clone()
    }

    pub async fn write_log(&self) -> Vec<String> {
        self.state.lock().await.write_log.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.objects.is_empty()
    }
}

#[async_trait]
impl BlobSink for InMemoryBlobSink {
    async fn put(&self, key: &BlobKey, body: Bytes) -> Result<(), ExportError> {
        let mut state = self.state.lock().await;
        state.write_log.push(key.to_string());

        if let Some(rule) = state.failures.get(key.as_str()).copied() {
            if rule.once {
                state.failures.remove(key.as_str());
            }
            return Err(ExportError::Upload {
                key: key.to_string(),
                kind: rule.kind,
                message: "injected failure".to_string(),
            });
        }

        state.objects.insert(key.to_string(), body);
        Ok(())
    }
}
