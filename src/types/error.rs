//! Error types for gremway

/// Main error type for gremway operations.
///
/// Status-code variants mirror the result codes Gremlin Server sends in
/// `status.code`; the remaining variants cover configuration, transport and
/// record-mapping failures. Kept `Clone` so a terminal status error can be
/// stored in the pending table and handed to the waiting caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GremlinError {
    #[error("invalid uri supplied in config")]
    InvalidUri,

    #[error("error connecting to websocket: {0}")]
    WsConnection(String),

    #[error("websocket connection is gone")]
    WsConnectionNil,

    #[error("you cannot write on a disposed connection")]
    ConnectionDisposed,

    #[error("client has no credentials for authentication with the server")]
    NoAuth,

    #[error("UNAUTHORIZED")]
    Unauthorized,

    #[error("AUTHENTICATE")]
    Authenticate,

    #[error("MALFORMED REQUEST")]
    MalformedRequest,

    #[error("INVALID REQUEST ARGUMENTS")]
    InvalidRequestArguments,

    #[error("SERVER ERROR")]
    ServerError,

    #[error("SCRIPT EVALUATION ERROR")]
    ScriptEvaluationError,

    #[error("SERVER TIMEOUT")]
    ServerTimeout,

    #[error("SERVER SERIALIZATION ERROR")]
    ServerSerializationError,

    #[error("unknown status code: {0}")]
    UnknownCode(u16),

    #[error("the record has no id field")]
    NoIdField,

    #[error("the record has no graph tags")]
    NoGraphTags,

    #[error("graph tag '{0}' has no kind option")]
    NoTagOption(String),

    #[error("unsupported property map value for '{0}'")]
    UnsupportedPropertyMap(String),

    #[error("property '{0}' cannot be cast")]
    CannotCastProperty(String),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("json error: {0}")]
    Json(String),

    #[error("i/o error: {0}")]
    Io(String),
}

// From conversions keep the error Clone by flattening foreign errors to strings.

impl From<tokio_tungstenite::tungstenite::Error> for GremlinError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

impl From<serde_json::Error> for GremlinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<std::io::Error> for GremlinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for gremway operations
pub type Result<T> = std::result::Result<T, GremlinError>;
