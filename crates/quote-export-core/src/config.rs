//! Export configuration from environment variables.
//!
//! Built once at startup and passed down explicitly; nothing here is global.

use std::env;
use std::time::Duration;

use crate::app::query::QueryTimeouts;
use crate::app::retry::RetryPolicy;
use crate::domain::ExportError;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.yandexcloud.net";
pub const DEFAULT_STORAGE_REGION: &str = "ru-central1";

/// YDB connection settings. Credentials come from the instance metadata
/// service, never from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// e.g. `grpcs://ydb.serverless.yandexcloud.net:2135`
    pub endpoint: String,
    /// e.g. `/ru-central1/b1g.../etn...`
    pub database: String,
    /// Bound on the initial driver-ready wait.
    pub ready_timeout: Duration,
    pub query_timeouts: QueryTimeouts,
}

impl DatabaseConfig {
    /// Connection string in the form the YDB client expects.
    pub fn connection_string(&self) -> String {
        format!("{}?database={}", self.endpoint, self.database)
    }
}

/// Object storage settings.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

// 鍵はログに出さない
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &"<redacted>")
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub retry: RetryPolicy,
}

impl ExportConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`: static storage keys
    /// - `BUCKET_NAME`: target bucket
    /// - `YDB_ENDPOINT`, `YDB_DATABASE`: database location
    ///
    /// Optional:
    /// - `STORAGE_ENDPOINT` (default: https://storage.yandexcloud.net)
    /// - `STORAGE_REGION` (default: ru-central1)
    /// - `EXPORT_MAX_ATTEMPTS` (default: 2)
    pub fn from_env() -> Result<Self, ExportError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ExportConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ExportError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ExportError::Configuration(format!("{key} is not set")))
        };

        let database = DatabaseConfig {
            endpoint: required("YDB_ENDPOINT")?,
            database: required("YDB_DATABASE")?,
            ready_timeout: Duration::from_secs(5),
            query_timeouts: QueryTimeouts::default(),
        };

        let storage = StorageConfig {
            endpoint: lookup("STORAGE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_STORAGE_ENDPOINT.to_string()),
            region: lookup("STORAGE_REGION")
                .unwrap_or_else(|| DEFAULT_STORAGE_REGION.to_string()),
            bucket: required("BUCKET_NAME")?,
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
        };

        let mut retry = RetryPolicy::default_v1();
        if let Some(raw) = lookup("EXPORT_MAX_ATTEMPTS") {
            let attempts: u32 = raw.trim().parse().map_err(|_| {
                ExportError::Configuration(format!(
                    "EXPORT_MAX_ATTEMPTS must be a positive integer, got {raw:?}"
                ))
            })?;
            if attempts == 0 {
                return Err(ExportError::Configuration(
                    "EXPORT_MAX_ATTEMPTS must be at least 1".to_string(),
                ));
            }
            retry = retry.with_max_attempts(attempts);
        }

        Ok(Self {
            database,
            storage,
            retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AWS_ACCESS_KEY_ID", "key-id"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("BUCKET_NAME", "quotes-bucket"),
            ("YDB_ENDPOINT", "grpcs://ydb.serverless.yandexcloud.net:2135"),
            ("YDB_DATABASE", "/ru-central1/b1g/etn"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<ExportConfig, ExportError> {
        ExportConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let cfg = load(&base_env()).unwrap();

        assert_eq!(cfg.storage.bucket, "quotes-bucket");
        assert_eq!(cfg.storage.endpoint, DEFAULT_STORAGE_ENDPOINT);
        assert_eq!(cfg.storage.region, DEFAULT_STORAGE_REGION);
        assert_eq!(cfg.database.ready_timeout, Duration::from_secs(5));
        assert_eq!(cfg.database.query_timeouts, QueryTimeouts::default());
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(
            cfg.database.connection_string(),
            "grpcs://ydb.serverless.yandexcloud.net:2135?database=/ru-central1/b1g/etn"
        );
    }

    #[rstest]
    #[case("AWS_ACCESS_KEY_ID")]
    #[case("AWS_SECRET_ACCESS_KEY")]
    #[case("BUCKET_NAME")]
    #[case("YDB_ENDPOINT")]
    #[case("YDB_DATABASE")]
    fn missing_required_variable_is_a_configuration_error(#[case] key: &'static str) {
        let mut env = base_env();
        env.remove(key);

        let err = load(&env).unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
        assert!(err.to_string().contains(key));
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("BUCKET_NAME", "  ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn overrides_are_applied() {
        let mut env = base_env();
        env.insert("STORAGE_ENDPOINT", "http://localhost:9000");
        env.insert("STORAGE_REGION", "us-east-1");
        env.insert("EXPORT_MAX_ATTEMPTS", "4");

        let cfg = load(&env).unwrap();
        assert_eq!(cfg.storage.endpoint, "http://localhost:9000");
        assert_eq!(cfg.storage.region, "us-east-1");
        assert_eq!(cfg.retry.max_attempts, 4);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("many")]
    fn invalid_attempt_bound_is_rejected(#[case] raw: &'static str) {
        let mut env = base_env();
        env.insert("EXPORT_MAX_ATTEMPTS", raw);
        assert!(matches!(load(&env), Err(ExportError::Configuration(_))));
    }

    #[test]
    fn debug_output_hides_keys() {
        let cfg = load(&base_env()).unwrap();
        let dbg = format!("{:?}", cfg.storage);
        assert!(!dbg.contains("\"secret\""));
        assert!(!dbg.contains("\"key-id\""));
        assert!(dbg.contains("quotes-bucket"));
    }
}
