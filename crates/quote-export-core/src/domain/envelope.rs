//! ResponseEnvelope - 呼び出し元（platform）へ返す結果
//!
//! 1 invocation につき 1 回だけ作られる終端値。

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::errors::ExportError;

pub const STATUS_OK: u16 = 200;

/// Failure status for any unrecovered error.
///
/// Consumers of this function already treat 404 as "export failed", so it
/// stays 404 even though nothing was "not found".
pub const STATUS_FAILED: u16 = 404;

/// `{"statusCode": 200|404, "body": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub body: String,
}

impl ResponseEnvelope {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_OK,
            body: body.into(),
        }
    }

    pub fn failure(err: &ExportError) -> Self {
        Self {
            status_code: STATUS_FAILED,
            body: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

/// Platform-supplied invocation context.
///
/// Only used to tag log output; business logic ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            function_name: None,
        }
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new(Ulid::new().to_string())
    }
}
