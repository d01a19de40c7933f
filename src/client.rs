//! Client facade.
//!
//! A [`Client`] wraps one multiplexed connection. Queries from any number of
//! tasks are framed, queued FIFO, and correlated back by request id; graph
//! operations compose traversal text from [`GraphRecord`] values before
//! executing it.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::correlate::Correlator;
use crate::graph::mapping::decode_records;
use crate::graph::record::GraphRecord;
use crate::graph::traversal;
use crate::request::{package_request, prepare_request, Bindings};
use crate::types::{GremlinError, Result};

/// Stream of asynchronous transport and protocol faults.
///
/// One supervising task can watch every I/O failure here without coupling to
/// any single call; per-call failures are returned synchronously instead.
pub type ErrorStream = mpsc::UnboundedReceiver<GremlinError>;

/// Asynchronous Gremlin client over a single multiplexed WebSocket.
pub struct Client {
    conf: ClientConfig,
    conn: Connection,
    correlator: Arc<Correlator>,
}

impl Client {
    /// Connect to the configured endpoint and start the connection loops.
    ///
    /// Returns the client together with the error stream carrying
    /// asynchronous transport faults.
    pub async fn connect(conf: ClientConfig) -> Result<(Self, ErrorStream)> {
        if conf.uri.is_empty() {
            return Err(GremlinError::InvalidUri);
        }

        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let conn = Connection::new(&conf, err_tx);
        let correlator = Arc::new(Correlator::new(conn.request_sender(), conf.auth.clone()));
        conn.open(Arc::clone(&correlator)).await?;

        Ok((
            Self {
                conf,
                conn,
                correlator,
            },
            err_rx,
        ))
    }

    /// Execute a raw Gremlin query and return the buffered result records.
    pub async fn execute(
        &self,
        query: &str,
        bindings: Option<Bindings>,
        rebindings: Option<Bindings>,
    ) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        self.execute_request(
            query,
            bindings.unwrap_or_default(),
            rebindings.unwrap_or_default(),
        )
        .await
    }

    /// Execute a Gremlin script read from a file.
    pub async fn execute_file(
        &self,
        path: impl AsRef<Path>,
        bindings: Option<Bindings>,
        rebindings: Option<Bindings>,
    ) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        let query = tokio::fs::read_to_string(path).await?;
        self.execute_request(
            &query,
            bindings.unwrap_or_default(),
            rebindings.unwrap_or_default(),
        )
        .await
    }

    /// Execute a query and decode the vertex results into `out`.
    ///
    /// An empty result leaves `out` untouched and is not an error.
    pub async fn get<T>(
        &self,
        query: &str,
        bindings: Option<Bindings>,
        out: &mut Vec<T>,
    ) -> Result<()>
    where
        T: GraphRecord + DeserializeOwned,
    {
        let data = self.execute(query, bindings, None).await?;
        if data.is_empty() {
            return Ok(());
        }
        decode_records(&data, out)
    }

    /// Add a vertex with the given label from a record's tagged fields.
    pub async fn add_v<T: GraphRecord>(&self, label: &str, record: &T) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        let query = traversal::add_vertex(label, record)?;
        if self.conf.debug {
            debug!(query = query.as_str(), "add vertex");
        }
        self.execute_plain(&query).await
    }

    /// Update the vertex identified by the record's id from its tagged
    /// fields. List properties are replaced, not appended.
    pub async fn update_v<T: GraphRecord>(&self, record: &T) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        let query = traversal::update_vertex(record)?;
        if self.conf.debug {
            debug!(query = query.as_str(), "update vertex");
        }
        self.execute_plain(&query).await
    }

    /// Drop the vertex identified by the record's id.
    pub async fn drop_v<T: GraphRecord>(&self, record: &T) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        let query = traversal::drop_vertex(record);
        if self.conf.debug {
            debug!(query = query.as_str(), "drop vertex");
        }
        self.execute_plain(&query).await
    }

    /// Add an edge with the given label between two records.
    pub async fn add_e<F, T>(&self, label: &str, from: &F, to: &T) -> Result<Vec<Value>>
    where
        F: GraphRecord,
        T: GraphRecord,
    {
        self.add_e_by_id(label, from.id(), to.id()).await
    }

    /// Add an edge between two vertices by raw id.
    pub async fn add_e_by_id(&self, label: &str, from: Uuid, to: Uuid) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        let query = traversal::add_edge(label, from, to);
        if self.conf.debug {
            debug!(query = query.as_str(), "add edge");
        }
        self.execute_plain(&query).await
    }

    /// Add an edge carrying a property map between two records.
    pub async fn add_e_with_props<F, T>(
        &self,
        label: &str,
        from: &F,
        to: &T,
        props: &Bindings,
    ) -> Result<Vec<Value>>
    where
        F: GraphRecord,
        T: GraphRecord,
    {
        self.add_e_with_props_by_id(label, from.id(), to.id(), props)
            .await
    }

    /// Add an edge carrying a property map between two vertices by raw id.
    pub async fn add_e_with_props_by_id(
        &self,
        label: &str,
        from: Uuid,
        to: Uuid,
        props: &Bindings,
    ) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        let query = traversal::add_edge_with_props(label, from, to, props)?;
        if self.conf.debug {
            debug!(query = query.as_str(), "add edge with props");
        }
        self.execute_plain(&query).await
    }

    /// Drop the labeled edge between two records.
    pub async fn drop_e<F, T>(&self, label: &str, from: &F, to: &T) -> Result<Vec<Value>>
    where
        F: GraphRecord,
        T: GraphRecord,
    {
        self.drop_e_by_id(label, from.id(), to.id()).await
    }

    /// Drop the labeled edge between two vertices by raw id.
    pub async fn drop_e_by_id(&self, label: &str, from: Uuid, to: Uuid) -> Result<Vec<Value>> {
        self.ensure_writable().await?;
        let query = traversal::drop_edge(label, from, to);
        if self.conf.debug {
            debug!(query = query.as_str(), "drop edge");
        }
        self.execute_plain(&query).await
    }

    /// Re-dial and restart the connection loops, but only when the transport
    /// is not currently connected. In-flight requests are not replayed.
    pub async fn reconnect(&self) -> Result<()> {
        if self.conn.is_disposed().await {
            return Err(GremlinError::ConnectionDisposed);
        }
        if self.conn.is_connected().await {
            return Ok(());
        }
        self.conn.open(Arc::clone(&self.correlator)).await
    }

    /// Whether the transport currently believes the socket is alive.
    pub async fn is_connected(&self) -> bool {
        self.conn.is_connected().await
    }

    /// Close the connection and mark the client disposed. All further
    /// write-facing operations fail with
    /// [`GremlinError::ConnectionDisposed`].
    pub async fn close(&self) {
        self.conn.close().await;
    }

    async fn execute_plain(&self, query: &str) -> Result<Vec<Value>> {
        self.execute_request(query, Bindings::new(), Bindings::new())
            .await
    }

    async fn execute_request(
        &self,
        query: &str,
        bindings: Bindings,
        rebindings: Bindings,
    ) -> Result<Vec<Value>> {
        let req = prepare_request(query, bindings, rebindings);
        let msg = package_request(&req)?;
        if self.conf.verbose {
            debug!(request_id = %req.request_id, query, "dispatching request");
        }

        let done = self.correlator.register(req.request_id);
        self.conn.dispatch(msg).await?;
        self.correlator
            .retrieve(req.request_id, done, self.conf.reading_wait)
            .await
    }

    async fn ensure_writable(&self) -> Result<()> {
        if self.conn.is_disposed().await {
            return Err(GremlinError::ConnectionDisposed);
        }
        // loops dead and liveness gone: there is no socket to write to
        if self.conn.is_errored() && !self.conn.is_connected().await {
            return Err(GremlinError::WsConnectionNil);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_empty_uri() {
        let err = Client::connect(ClientConfig::new("")).await.err().unwrap();
        assert_eq!(err, GremlinError::InvalidUri);
    }

    #[tokio::test]
    async fn test_connect_failure_is_ws_connection() {
        // nothing listens on port 9; both the direct dial and the /gremlin
        // fallback must fail
        let conf = ClientConfig::new("ws://127.0.0.1:9")
            .with_timeout(std::time::Duration::from_millis(500));
        let err = Client::connect(conf).await.err().unwrap();
        assert!(matches!(err, GremlinError::WsConnection(_)), "got {err:?}");
    }
}
