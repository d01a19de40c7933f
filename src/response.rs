//! Inbound response frames and status-code classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{GremlinError, Result};

/// Response envelope read from Gremlin Server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GremlinResponse {
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    #[serde(default)]
    pub status: GremlinStatus,
    #[serde(default)]
    pub result: GremlinResult,
}

/// `status` section of a response. `attributes` is carried opaquely; Cosmos DB
/// puts its `x-ms-*` request-charge numbers there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GremlinStatus {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub message: String,
}

/// `result` section of a response. `data` may be null for challenge frames.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GremlinResult {
    #[serde(default)]
    pub data: Option<Vec<Value>>,
    #[serde(default)]
    pub meta: Value,
}

/// Parse a raw frame body into a response envelope.
pub fn parse_response(msg: &[u8]) -> Result<GremlinResponse> {
    let resp: GremlinResponse = serde_json::from_slice(msg)?;
    Ok(resp)
}

/// Map a `status.code` to the error it signals, if any.
///
/// 200 (ok), 204 (no content) and 206 (partial, more frames follow) are not
/// errors.
pub fn status_error(code: u16) -> Option<GremlinError> {
    match code {
        200 | 204 | 206 => None,
        401 => Some(GremlinError::Unauthorized),
        407 => Some(GremlinError::Authenticate),
        498 => Some(GremlinError::MalformedRequest),
        499 => Some(GremlinError::InvalidRequestArguments),
        500 => Some(GremlinError::ServerError),
        597 => Some(GremlinError::ScriptEvaluationError),
        598 => Some(GremlinError::ServerTimeout),
        599 => Some(GremlinError::ServerSerializationError),
        other => Some(GremlinError::UnknownCode(other)),
    }
}
