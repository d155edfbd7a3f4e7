//! Errors - エラー型と分類
//!
//! retry wrapper が見るのは `ErrorKind` だけ。メッセージは envelope の body に
//! そのまま載るので、利用者が読める文言にしておく。

use std::time::Duration;

use thiserror::Error;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（pipeline ごと再実行してよい）
/// - Fatal: 恒久的なエラー（認証・スキーマ・設定など、再実行しても無意味）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Fatal,
}

/// Which bounded wait ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Waiting for the database driver to become ready.
    DriverReady,
    /// The read transaction itself.
    Transaction,
    /// The whole query operation (transaction plus session handling).
    Operation,
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Deadline::DriverReady => "driver ready wait",
            Deadline::Transaction => "read transaction",
            Deadline::Operation => "query operation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database driver is not ready: {0}")]
    Connectivity(String),

    #[error("deadline exceeded: {deadline} did not finish within {timeout:?}")]
    DeadlineExceeded { deadline: Deadline, timeout: Duration },

    #[error("database error: {message}")]
    Database { kind: ErrorKind, message: String },

    #[error("failed to upload {key}: {message}")]
    Upload {
        key: String,
        kind: ErrorKind,
        message: String,
    },
}

impl ExportError {
    pub fn transient_database(message: impl Into<String>) -> Self {
        ExportError::Database {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal_database(message: impl Into<String>) -> Self {
        ExportError::Database {
            kind: ErrorKind::Fatal,
            message: message.into(),
        }
    }

    /// Classification used by the retry wrapper.
    ///
    /// A timed-out driver wait ends the invocation; a timed-out query is
    /// treated like a dropped connection and may be re-run.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Configuration(_) | ExportError::Connectivity(_) => ErrorKind::Fatal,
            ExportError::DeadlineExceeded { deadline, .. } => match deadline {
                Deadline::DriverReady => ErrorKind::Fatal,
                Deadline::Transaction | Deadline::Operation => ErrorKind::Transient,
            },
            ExportError::Database { kind, .. } | ExportError::Upload { kind, .. } => *kind,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
