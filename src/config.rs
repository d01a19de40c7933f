//! Client configuration.

use std::time::Duration;

use uuid::Uuid;

use crate::request::{prepare_auth_request, GremlinRequest};

/// Configuration for a [`Client`](crate::Client).
///
/// Built with [`ClientConfig::new`] and adjusted with the `with_*` setters:
///
/// ```no_run
/// # use gremway::ClientConfig;
/// # use std::time::Duration;
/// let conf = ClientConfig::new("ws://localhost:8182")
///     .with_timeout(Duration::from_secs(10))
///     .with_authentication("user", "pass");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the Gremlin server
    pub uri: String,
    /// Pre-built SASL request template, rewritten per 407 challenge
    pub(crate) auth: Option<GremlinRequest>,
    /// Emit request/response debug logging
    pub debug: bool,
    /// Emit per-frame trace logging
    pub verbose: bool,
    /// Handshake timeout
    pub timeout: Duration,
    /// Keepalive ping period
    pub ping_interval: Duration,
    /// Per-write deadline
    pub writing_wait: Duration,
    /// Per-read deadline, also the per-call result timeout
    pub reading_wait: Duration,
}

impl ClientConfig {
    /// Create a config with the default timeouts for the given endpoint.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            auth: None,
            debug: false,
            verbose: false,
            timeout: Duration::from_secs(5),
            ping_interval: Duration::from_secs(60),
            writing_wait: Duration::from_secs(15),
            reading_wait: Duration::from_secs(15),
        }
    }

    /// Set credentials used to answer SASL authentication challenges.
    ///
    /// The request template is built once here; only its request id changes
    /// per challenge.
    pub fn with_authentication(mut self, username: &str, password: &str) -> Self {
        self.auth = Some(prepare_auth_request(Uuid::new_v4(), username, password));
        self
    }

    /// Enable debug logging.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Enable verbose (per-frame) logging.
    pub fn with_verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Set the handshake timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the keepalive ping period.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the per-write deadline.
    pub fn with_writing_wait(mut self, wait: Duration) -> Self {
        self.writing_wait = wait;
        self
    }

    /// Set the per-read deadline and per-call result timeout.
    pub fn with_reading_wait(mut self, wait: Duration) -> Self {
        self.reading_wait = wait;
        self
    }
}
