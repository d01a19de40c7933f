//! Request/response correlation.
//!
//! Server responses arrive on one socket in arbitrary order, and a single
//! request may span several frames (status 206 marks a partial). The
//! correlator keys a pending table by request id, accumulates partial
//! results, answers SASL challenges in place, and signals the waiting caller
//! when the terminal frame lands.

use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::request::{package_request, GremlinRequest};
use crate::response::{parse_response, status_error, GremlinResponse};
use crate::types::{GremlinError, Result};

/// Per-request accumulation state.
///
/// Mutated only under its pending-table entry lock, so a partial frame and
/// the terminal signal can never interleave with a waiter's read.
#[derive(Default)]
struct PendingEntry {
    data: Vec<Value>,
    error: Option<GremlinError>,
    notify: Option<oneshot::Sender<()>>,
    auth_retried: bool,
}

pub(crate) struct Correlator {
    pending: DashMap<Uuid, PendingEntry>,
    /// Writer queue, used to inject authentication frames
    request_tx: mpsc::Sender<Vec<u8>>,
    /// SASL request template from the config, if credentials were given
    auth: Option<GremlinRequest>,
}

impl Correlator {
    pub(crate) fn new(request_tx: mpsc::Sender<Vec<u8>>, auth: Option<GremlinRequest>) -> Self {
        Self {
            pending: DashMap::new(),
            request_tx,
            auth,
        }
    }

    /// Register a pending request before its frame is dispatched.
    ///
    /// The returned receiver resolves once the terminal frame for the id has
    /// been recorded.
    pub(crate) fn register(&self, id: Uuid) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id,
            PendingEntry {
                notify: Some(tx),
                ..Default::default()
            },
        );
        rx
    }

    /// Route one raw response frame.
    pub(crate) async fn handle_frame(&self, msg: &[u8]) -> Result<()> {
        let resp = parse_response(msg)?;
        debug!(request_id = %resp.request_id, code = resp.status.code, "response frame");

        if resp.status.code == 407 {
            return self.answer_challenge(resp.request_id).await;
        }

        self.save_response(resp);
        Ok(())
    }

    /// Append a frame's data under the entry lock; signal on terminal status.
    fn save_response(&self, resp: GremlinResponse) {
        let error = status_error(resp.status.code);
        let terminal = resp.status.code != 206;

        let notify = {
            let mut entry = self.pending.entry(resp.request_id).or_default();
            if let Some(data) = resp.result.data {
                entry.data.extend(data);
            }
            if terminal {
                if entry.error.is_none() {
                    entry.error = error;
                }
                entry.notify.take()
            } else {
                None
            }
        };

        if let Some(tx) = notify {
            let _ = tx.send(());
        }
    }

    /// Answer a 407 challenge by enqueueing an authentication frame that
    /// reuses the challenged request id. One retry per id; a second
    /// challenge completes the caller with `Unauthorized`.
    async fn answer_challenge(&self, id: Uuid) -> Result<()> {
        let Some(template) = &self.auth else {
            self.complete_with(id, GremlinError::NoAuth);
            return Ok(());
        };

        let already_retried = {
            let mut entry = self.pending.entry(id).or_default();
            let prior = entry.auth_retried;
            entry.auth_retried = true;
            prior
        };
        if already_retried {
            self.complete_with(id, GremlinError::Unauthorized);
            return Ok(());
        }

        let mut req = template.clone();
        req.request_id = id;
        let msg = package_request(&req)?;
        debug!(request_id = %id, "answering authentication challenge");
        self.request_tx
            .send(msg)
            .await
            .map_err(|_| GremlinError::ConnectionDisposed)?;
        Ok(())
    }

    fn complete_with(&self, id: Uuid, err: GremlinError) {
        let notify = {
            let mut entry = self.pending.entry(id).or_default();
            entry.error = Some(err);
            entry.notify.take()
        };
        if let Some(tx) = notify {
            let _ = tx.send(());
        }
    }

    /// Wait for the terminal frame or the `wait` deadline, then consume the
    /// pending entry. A deadline hit yields an empty result, not an error.
    pub(crate) async fn retrieve(
        &self,
        id: Uuid,
        done: oneshot::Receiver<()>,
        wait: Duration,
    ) -> Result<Vec<Value>> {
        match timeout(wait, done).await {
            Ok(_) => match self.pending.remove(&id) {
                Some((_, entry)) => match entry.error {
                    Some(err) => Err(err),
                    None => Ok(entry.data),
                },
                None => Ok(Vec::new()),
            },
            Err(_) => {
                debug!(request_id = %id, "timed out waiting for response");
                self.pending.remove(&id);
                Ok(Vec::new())
            }
        }
    }
}
