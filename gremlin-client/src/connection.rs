//! Connection management.
//!
//! A [`Connection`] owns one WebSocket. Writes go through a mutex around the
//! write half; a single read loop owns the read half and routes every
//! response to the request registered under its `requestId`. Several
//! requests can therefore be in flight on one connection.

use crate::auth::AuthSource;
use crate::cluster::Endpoint;
use crate::error::ClientError;
use crate::stream::ClientStream;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use gremlin_protocol::{Decoder, Encoder, Request, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

type WsStream = WebSocketStream<ClientStream>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;
type ResponseSender = mpsc::UnboundedSender<Result<Response, ClientError>>;

/// In-flight requests by ID, tagged with the registration that owns them.
type PendingMap = HashMap<Uuid, (u64, ResponseSender)>;

#[derive(Default)]
struct Pending {
    map: std::sync::Mutex<PendingMap>,
    next_ticket: AtomicU64,
}

impl Pending {
    fn lock(&self) -> MutexGuard<'_, PendingMap> {
        self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Default connect timeout (TCP + TLS + WebSocket handshake).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS configuration for client connections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsClientConfig {
    /// Enable TLS even for `ws://` endpoints.
    pub enabled: bool,
    /// Path to PEM-encoded CA certificate(s) for server verification.
    /// If None, the bundled web PKI roots are used.
    pub ca_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded client certificate (for mTLS).
    pub client_cert_path: Option<PathBuf>,
    /// Path to PEM-encoded client private key (for mTLS).
    pub client_key_path: Option<PathBuf>,
    /// Skip server certificate verification (INSECURE - development only).
    pub insecure: bool,
    /// Server name for SNI (defaults to the endpoint host).
    pub server_name: Option<String>,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self.enabled = true;
        self
    }

    pub fn with_client_cert(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert_path = Some(cert_path.into());
        self.client_key_path = Some(key_path.into());
        self.enabled = true;
        self
    }

    pub fn with_insecure(mut self) -> Self {
        self.insecure = true;
        self.enabled = true;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server endpoint.
    pub endpoint: Endpoint,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Wait limit for each inbound frame of a request. None waits forever.
    pub request_timeout: Option<Duration>,
    /// Credential sources consulted when the server challenges.
    pub auth: Vec<AuthSource>,
    /// TLS configuration (optional).
    pub tls: Option<TlsClientConfig>,
}

impl ConnectionConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            auth: Vec::new(),
            tls: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Appends explicit credentials to the source list.
    pub fn with_credentials(self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.with_auth_source(AuthSource::user_pass(user, pass))
    }

    /// Appends `GREMLIN_USER`/`GREMLIN_PASS` to the source list.
    pub fn with_env_credentials(self) -> Self {
        self.with_auth_source(AuthSource::env())
    }

    pub fn with_auth_source(mut self, source: AuthSource) -> Self {
        self.auth.push(source);
        self
    }

    pub fn with_tls(mut self, tls_config: TlsClientConfig) -> Self {
        self.tls = Some(tls_config);
        self
    }
}

/// Responses routed to one in-flight request.
///
/// Dropping it stops routing, so an abandoned request never stays
/// registered.
pub struct PendingResponses {
    request_id: Uuid,
    ticket: u64,
    rx: mpsc::UnboundedReceiver<Result<Response, ClientError>>,
    pending: Arc<Pending>,
}

impl PendingResponses {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Waits for the next response frame for this request.
    pub async fn next(&mut self, timeout: Option<Duration>) -> Result<Response, ClientError> {
        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.rx.recv())
                .await
                .map_err(|_| {
                    tracing::debug!("Request id={} timed out", self.request_id);
                    ClientError::Timeout
                })?,
            None => self.rx.recv().await,
        };
        received.unwrap_or(Err(ClientError::ConnectionClosed))
    }
}

impl Drop for PendingResponses {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        if matches!(pending.get(&self.request_id), Some((ticket, _)) if *ticket == self.ticket) {
            pending.remove(&self.request_id);
        }
    }
}

/// A connection to a Gremlin server.
pub struct Connection {
    config: ConnectionConfig,
    /// Write half of the socket (for sending requests).
    writer: Mutex<Option<WsWriter>>,
    /// Read half of the socket, taken by the read loop.
    reader: Mutex<Option<WsReader>>,
    /// In-flight requests by ID.
    pending: Arc<Pending>,
    /// Is the connection established?
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            pending: Arc::new(Pending::default()),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// Opens the socket and performs the WebSocket handshake.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let endpoint = &self.config.endpoint;
        tracing::debug!("Connecting to {}...", endpoint);

        let ws = tokio::time::timeout(self.config.connect_timeout, self.handshake())
            .await
            .map_err(|_| {
                tracing::debug!("Connection to {} timed out", endpoint);
                ClientError::Timeout
            })??;

        let (write_half, read_half) = ws.split();
        *self.writer.lock().await = Some(write_half);
        *self.reader.lock().await = Some(read_half);
        self.connected.store(true, Ordering::SeqCst);

        tracing::debug!("Connected to {}", endpoint);
        Ok(())
    }

    async fn handshake(&self) -> Result<WsStream, ClientError> {
        let stream = ClientStream::open(&self.config.endpoint, self.config.tls.as_ref()).await?;
        tracing::debug!(
            "Socket open (tls={}), upgrading to WebSocket",
            stream.is_tls()
        );
        let (ws, _) =
            tokio_tungstenite::client_async(self.config.endpoint.uri().clone(), stream).await?;
        Ok(ws)
    }

    /// Registers a request so the read loop routes its responses here.
    ///
    /// The registration lasts until the returned handle is dropped.
    pub fn register(&self, request_id: Uuid) -> Result<PendingResponses, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let mut pending = self.pending.lock();
        if pending.contains_key(&request_id) {
            return Err(ClientError::DuplicateRequestId(request_id));
        }
        let ticket = self.pending.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        pending.insert(request_id, (ticket, tx));
        Ok(PendingResponses {
            request_id,
            ticket,
            rx,
            pending: self.pending.clone(),
        })
    }

    /// Encodes and writes a request.
    pub async fn send(&self, request: &Request) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let encoded = Encoder::encode_request(request)?;
        tracing::debug!(
            "Sending request id={} op={:?} ({} bytes)",
            request.request_id,
            request.op,
            encoded.len()
        );

        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer.send(Message::Binary(encoded.to_vec())).await?;
        Ok(())
    }

    /// Reads and dispatches responses until the socket closes or fails.
    ///
    /// Run this in a background task. Any failure is delivered to every
    /// in-flight request before the loop returns.
    pub async fn read_loop(&self) -> Result<(), ClientError> {
        let mut reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or(ClientError::NotConnected)?;
        tracing::debug!("read_loop started");

        loop {
            let data = match reader.next().await {
                Some(Ok(Message::Binary(data))) => data,
                Some(Ok(Message::Text(text))) => text.into_bytes(),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("read_loop: server closed connection: {:?}", frame);
                    self.shutdown(|| ClientError::ConnectionClosed);
                    return Err(ClientError::ConnectionClosed);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::debug!("read_loop: transport error: {}", e);
                    let reason = e.to_string();
                    self.shutdown(|| ClientError::Transport(reason.clone()));
                    return Err(e.into());
                }
                None => {
                    tracing::debug!("read_loop: connection closed");
                    self.shutdown(|| ClientError::ConnectionClosed);
                    return Err(ClientError::ConnectionClosed);
                }
            };

            let response = match Decoder::decode_response(&data) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("read_loop: undecodable message: {}", e);
                    let reason = e.to_string();
                    self.shutdown(|| ClientError::MalformedResponse(reason.clone()));
                    return Err(e.into());
                }
            };

            let id = response.request_id;
            tracing::debug!(
                "read_loop: dispatching response id={} status={}",
                id,
                response.status.code
            );
            let mut pending = self.pending.lock();
            match pending.get(&id) {
                Some((_, tx)) => {
                    if tx.send(Ok(response)).is_err() {
                        pending.remove(&id);
                    }
                }
                None => tracing::warn!("read_loop: no pending request for id={}", id),
            }
        }
    }

    /// Marks the connection closed and fails every in-flight request.
    fn shutdown(&self, error: impl Fn() -> ClientError) {
        self.connected.store(false, Ordering::SeqCst);
        let mut pending = self.pending.lock();
        tracing::debug!("Failing {} pending request(s)", pending.len());
        for (_, (_, tx)) in pending.drain() {
            let _ = tx.send(Err(error()));
        }
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection to {}...", self.config.endpoint);
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.close().await;
        }
        let _ = self.reader.lock().await.take();

        let mut pending = self.pending.lock();
        tracing::debug!("Clearing {} pending requests", pending.len());
        pending.clear();
        Ok(())
    }

    /// Returns the number of in-flight requests.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
