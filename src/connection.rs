//! WebSocket transport and the connection's three I/O loops.
//!
//! The connection owns the socket. After the handshake the stream is split;
//! the writer loop drains the bounded request queue, the reader loop feeds
//! frames to the correlator, and the pinger keeps the liveness flag honest.
//! All three exit when the shared quit signal fires or the socket dies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::correlate::Correlator;
use crate::types::{GremlinError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Outbound request queue depth. A full queue blocks callers until the
/// writer drains it.
const REQUEST_QUEUE_CAPACITY: usize = 3;

pub(crate) struct Connection {
    /// Effective endpoint; rewritten once if the `/gremlin` fallback lands
    uri: RwLock<String>,
    handshake_timeout: Duration,
    ping_interval: Duration,
    writing_wait: Duration,
    reading_wait: Duration,
    request_tx: mpsc::Sender<Vec<u8>>,
    /// Shared with the writer loop so a reconnect can respawn it
    request_rx: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
    /// Write half of the current socket; writer, pinger and close share it
    sink: Arc<Mutex<Option<WsSink>>>,
    connected: Arc<RwLock<bool>>,
    disposed: Arc<RwLock<bool>>,
    errored: Arc<AtomicBool>,
    quit_tx: watch::Sender<bool>,
    err_tx: mpsc::UnboundedSender<GremlinError>,
}

impl Connection {
    pub(crate) fn new(conf: &ClientConfig, err_tx: mpsc::UnboundedSender<GremlinError>) -> Self {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let (quit_tx, _) = watch::channel(false);

        Self {
            uri: RwLock::new(conf.uri.clone()),
            handshake_timeout: conf.timeout,
            ping_interval: conf.ping_interval,
            writing_wait: conf.writing_wait,
            reading_wait: conf.reading_wait,
            request_tx,
            request_rx: Arc::new(Mutex::new(request_rx)),
            sink: Arc::new(Mutex::new(None)),
            connected: Arc::new(RwLock::new(false)),
            disposed: Arc::new(RwLock::new(false)),
            errored: Arc::new(AtomicBool::new(false)),
            quit_tx,
            err_tx,
        }
    }

    /// Sender half of the writer queue, used by the correlator to inject
    /// authentication frames.
    pub(crate) fn request_sender(&self) -> mpsc::Sender<Vec<u8>> {
        self.request_tx.clone()
    }

    /// Dial the endpoint and start the writer, reader and pinger loops.
    pub(crate) async fn open(&self, correlator: Arc<Correlator>) -> Result<()> {
        if *self.disposed.read().await {
            return Err(GremlinError::ConnectionDisposed);
        }

        // stop any loops left over from a previous socket; receivers
        // subscribed after this send do not observe it
        let _ = self.quit_tx.send(true);

        let stream = self.dial().await?;
        let (sink, source) = stream.split();
        *self.sink.lock().await = Some(sink);
        *self.connected.write().await = true;
        self.errored.store(false, Ordering::SeqCst);

        let uri = self.uri.read().await;
        info!(uri = uri.as_str(), "connected to gremlin server");
        drop(uri);

        tokio::spawn(writer_loop(
            Arc::clone(&self.sink),
            Arc::clone(&self.request_rx),
            self.writing_wait,
            Arc::clone(&self.connected),
            Arc::clone(&self.errored),
            self.err_tx.clone(),
            self.quit_tx.subscribe(),
        ));
        tokio::spawn(reader_loop(
            source,
            correlator,
            self.reading_wait,
            Arc::clone(&self.connected),
            Arc::clone(&self.errored),
            self.err_tx.clone(),
            self.quit_tx.subscribe(),
        ));
        tokio::spawn(pinger_loop(
            Arc::clone(&self.sink),
            self.ping_interval,
            self.writing_wait,
            Arc::clone(&self.connected),
            self.err_tx.clone(),
            self.quit_tx.subscribe(),
        ));

        Ok(())
    }

    /// Dial the configured URI. If the handshake fails without an HTTP
    /// response, retry exactly once with `/gremlin` appended (the 3.2.2+
    /// endpoint change).
    async fn dial(&self) -> Result<WsStream> {
        let uri = self.uri.read().await.clone();

        match timeout(self.handshake_timeout, connect_async(uri.as_str())).await {
            Ok(Ok((ws, _))) => return Ok(ws),
            Ok(Err(WsError::Http(resp))) => {
                // The server answered; the endpoint is wrong, not missing.
                return Err(GremlinError::WsConnection(format!(
                    "server returned {}",
                    resp.status()
                )));
            }
            Ok(Err(err)) => {
                debug!(%err, "handshake failed without a response, retrying with /gremlin");
            }
            Err(_) => {
                debug!("handshake timed out, retrying with /gremlin");
            }
        }

        let fallback = format!("{uri}/gremlin");
        match timeout(self.handshake_timeout, connect_async(fallback.as_str())).await {
            Ok(Ok((ws, _))) => {
                *self.uri.write().await = fallback;
                Ok(ws)
            }
            Ok(Err(err)) => Err(GremlinError::WsConnection(err.to_string())),
            Err(_) => Err(GremlinError::WsConnection("handshake timed out".into())),
        }
    }

    /// Enqueue a framed request for the writer loop, FIFO.
    pub(crate) async fn dispatch(&self, msg: Vec<u8>) -> Result<()> {
        self.request_tx
            .send(msg)
            .await
            .map_err(|_| GremlinError::ConnectionDisposed)
    }

    /// Close the connection: write a normal-closure frame, broadcast quit
    /// exactly once, and latch the disposed flag.
    pub(crate) async fn close(&self) {
        {
            let mut disposed = self.disposed.write().await;
            if *disposed {
                return;
            }
            *disposed = true;
        }

        {
            let mut sink = self.sink.lock().await;
            if let Some(ws) = sink.as_mut() {
                let _ = timeout(self.writing_wait, ws.send(Message::Close(None))).await;
                let _ = timeout(self.writing_wait, ws.close()).await;
            }
            *sink = None;
        }

        *self.connected.write().await = false;
        let _ = self.quit_tx.send(true);
        info!("connection closed");
    }

    pub(crate) async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    pub(crate) async fn is_disposed(&self) -> bool {
        *self.disposed.read().await
    }

    pub(crate) fn is_errored(&self) -> bool {
        self.errored.load(Ordering::SeqCst)
    }
}

/// Writer loop: drains the request queue in FIFO order. A write failure is
/// published, flags the connection as errored, and ends the loop.
async fn writer_loop(
    sink: Arc<Mutex<Option<WsSink>>>,
    request_rx: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
    writing_wait: Duration,
    connected: Arc<RwLock<bool>>,
    errored: Arc<AtomicBool>,
    err_tx: mpsc::UnboundedSender<GremlinError>,
    mut quit: watch::Receiver<bool>,
) {
    loop {
        let msg = tokio::select! {
            _ = quit.changed() => return,
            msg = async { request_rx.lock().await.recv().await } => match msg {
                Some(msg) => msg,
                None => return,
            },
        };

        let mut guard = sink.lock().await;
        let Some(ws) = guard.as_mut() else {
            let _ = err_tx.send(GremlinError::WsConnectionNil);
            errored.store(true, Ordering::SeqCst);
            return;
        };

        match timeout(writing_wait, ws.send(Message::Binary(msg))).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(%err, "write failed");
                let _ = err_tx.send(err.into());
                errored.store(true, Ordering::SeqCst);
                *connected.write().await = false;
                return;
            }
            Err(_) => {
                error!("write deadline exceeded");
                let _ = err_tx.send(GremlinError::WebSocket("write deadline exceeded".into()));
                errored.store(true, Ordering::SeqCst);
                *connected.write().await = false;
                return;
            }
        }
    }
}

/// Reader loop: reads with the per-operation deadline, routes frames to the
/// correlator and refreshes the liveness flag on pongs.
async fn reader_loop(
    mut source: WsSource,
    correlator: Arc<Correlator>,
    reading_wait: Duration,
    connected: Arc<RwLock<bool>>,
    errored: Arc<AtomicBool>,
    err_tx: mpsc::UnboundedSender<GremlinError>,
    mut quit: watch::Receiver<bool>,
) {
    loop {
        let msg = tokio::select! {
            _ = quit.changed() => return,
            read = timeout(reading_wait, source.next()) => match read {
                Ok(Some(Ok(msg))) => msg,
                Ok(Some(Err(err))) => {
                    warn!(%err, "read failed");
                    let _ = err_tx.send(err.into());
                    errored.store(true, Ordering::SeqCst);
                    return;
                }
                Ok(None) => {
                    let _ = err_tx.send(GremlinError::WebSocket("connection closed".into()));
                    errored.store(true, Ordering::SeqCst);
                    *connected.write().await = false;
                    return;
                }
                Err(_) => {
                    let _ = err_tx.send(GremlinError::WebSocket("read deadline exceeded".into()));
                    errored.store(true, Ordering::SeqCst);
                    return;
                }
            },
        };

        match msg {
            Message::Binary(data) => {
                if let Err(err) = correlator.handle_frame(&data).await {
                    let _ = err_tx.send(err);
                }
            }
            Message::Text(text) => {
                if let Err(err) = correlator.handle_frame(text.as_bytes()).await {
                    let _ = err_tx.send(err);
                }
            }
            Message::Pong(_) => {
                // the pong handler: liveness confirmed
                *connected.write().await = true;
            }
            Message::Close(frame) => {
                info!(?frame, "server closed connection");
                let _ = err_tx.send(GremlinError::WebSocket("connection closed".into()));
                errored.store(true, Ordering::SeqCst);
                *connected.write().await = false;
                return;
            }
            _ => {}
        }
    }
}

/// Pinger loop: sends a control ping every `ping_interval` with the write
/// deadline applied. A failed ping flips the liveness flag off; the pong
/// that answers a later success flips it back on.
async fn pinger_loop(
    sink: Arc<Mutex<Option<WsSink>>>,
    ping_interval: Duration,
    writing_wait: Duration,
    connected: Arc<RwLock<bool>>,
    err_tx: mpsc::UnboundedSender<GremlinError>,
    mut quit: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(ping_interval);
    // the first tick of a tokio interval is immediate
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = quit.changed() => return,
            _ = ticker.tick() => {
                let result = {
                    let mut guard = sink.lock().await;
                    let Some(ws) = guard.as_mut() else {
                        let _ = err_tx.send(GremlinError::WsConnectionNil);
                        *connected.write().await = false;
                        return;
                    };
                    timeout(writing_wait, ws.send(Message::Ping(Vec::new()))).await
                };
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(%err, "ping failed");
                        let _ = err_tx.send(err.into());
                        *connected.write().await = false;
                    }
                    Err(_) => {
                        warn!("ping deadline exceeded");
                        let _ = err_tx.send(GremlinError::WebSocket("ping deadline exceeded".into()));
                        *connected.write().await = false;
                    }
                }
            }
        }
    }
}
