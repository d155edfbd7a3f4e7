//! Driver / Connector port - DB 接続の確立
//!
//! Connector は invocation ごとに Driver を作る。Driver が ready になるまで
//! SessionPool には触らない。

use std::sync::Arc;

use async_trait::async_trait;

use super::session_pool::SessionPool;
use crate::domain::ExportError;

/// Connected (or connecting) database driver.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Resolves once the driver can serve requests.
    ///
    /// The caller bounds this with its own deadline; implementations may
    /// wait indefinitely.
    async fn wait_ready(&self) -> Result<(), ExportError>;

    fn session_pool(&self) -> Arc<dyn SessionPool>;
}

/// Builds a fresh driver for one invocation.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Driver>, ExportError>;
}
