//! gremway - async Gremlin client over a multiplexed WebSocket
//!
//! gremway talks to TinkerPop-compatible graph servers (Gremlin Server,
//! Cosmos DB Gremlin endpoint) over a single long-lived WebSocket. Any
//! number of tasks can submit queries concurrently; frames are correlated
//! back to their callers by request id, streamed partial results are
//! reassembled in arrival order, and SASL authentication challenges are
//! answered mid-stream without the caller noticing.
//!
//! Record types that implement [`GraphRecord`] map to vertices: their tagged
//! fields drive `addV` / update / drop traversal text, and query results
//! decode back into them.
//!
//! ```no_run
//! # use gremway::{Client, ClientConfig};
//! # async fn run() -> gremway::Result<()> {
//! let conf = ClientConfig::new("ws://localhost:8182").with_authentication("user", "pass");
//! let (client, _errors) = Client::connect(conf).await?;
//! let data = client.execute("g.V().count()", None, None).await?;
//! # let _ = data;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod connection;
mod correlate;
pub mod graph;
pub mod request;
pub mod response;
pub mod types;

pub use client::{Client, ErrorStream};
pub use config::ClientConfig;
pub use graph::{decode_records, parse_tag, FieldKind, GraphRecord, TagOptions};
pub use request::{Bindings, GremlinRequest, MIME_PREFIX};
pub use response::{GremlinResponse, GremlinResult, GremlinStatus};
pub use types::{GremlinError, Result};
