//! Outbound request framing for the Gremlin Server WebSocket protocol.
//!
//! Every frame the client writes is a binary WebSocket message carrying the
//! Gremlin mime marker followed by the JSON-encoded request envelope.

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::Result;

/// Mime marker prefixed to every outbound frame. The leading `!` is the
/// length byte of Gremlin's framing (0x21 == 33, the marker length).
pub const MIME_PREFIX: &[u8] = b"!application/vnd.gremlin-v2.0+json";

/// String-keyed argument map carried in a request (`bindings`, `rebindings`).
pub type Bindings = serde_json::Map<String, Value>;

/// Request envelope sent to Gremlin Server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GremlinRequest {
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    pub op: String,
    pub processor: String,
    pub args: Bindings,
}

/// Package a query and its bindings into an `eval` request envelope.
pub fn prepare_request(query: &str, bindings: Bindings, rebindings: Bindings) -> GremlinRequest {
    let mut args = Bindings::new();
    args.insert("language".into(), Value::String("gremlin-groovy".into()));
    args.insert("gremlin".into(), Value::String(query.into()));
    args.insert("bindings".into(), Value::Object(bindings));
    args.insert("rebindings".into(), Value::Object(rebindings));

    GremlinRequest {
        request_id: Uuid::new_v4(),
        op: "eval".into(),
        processor: String::new(),
        args,
    }
}

/// Build a SASL `authentication` request answering a 407 challenge.
///
/// The payload is the PLAIN mechanism: `0x00 ∥ username ∥ 0x00 ∥ password`,
/// base64-encoded.
pub fn prepare_auth_request(request_id: Uuid, username: &str, password: &str) -> GremlinRequest {
    let mut sasl = Vec::with_capacity(username.len() + password.len() + 2);
    sasl.push(0);
    sasl.extend_from_slice(username.as_bytes());
    sasl.push(0);
    sasl.extend_from_slice(password.as_bytes());

    let mut args = Bindings::new();
    args.insert("sasl".into(), Value::String(BASE64_STANDARD.encode(&sasl)));

    GremlinRequest {
        request_id,
        op: "authentication".into(),
        processor: "traversal".into(),
        args,
    }
}

/// Frame a request for delivery: mime marker + JSON body, one binary message.
pub fn package_request(req: &GremlinRequest) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(req)?;
    let mut msg = Vec::with_capacity(MIME_PREFIX.len() + body.len());
    msg.extend_from_slice(MIME_PREFIX);
    msg.extend_from_slice(&body);
    Ok(msg)
}
