//! High-level client API.

use crate::auth::AuthInfo;
use crate::cluster::{ClusterConfig, Endpoint};
use crate::connection::{Connection, ConnectionConfig, PendingResponses};
use crate::error::ClientError;
use crate::exchange::{Exchange, Step};
use bytes::Bytes;
use gremlin_protocol::Request;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// High-level client for Gremlin Server.
///
/// Requests may be submitted concurrently from several tasks; responses are
/// routed by request ID.
pub struct Client {
    conn: Arc<Connection>,
    read_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::from_connection(Connection::new(config))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(conn),
            read_task: std::sync::Mutex::new(None),
        }
    }

    /// Connects to a single endpoint.
    pub async fn open(config: ConnectionConfig) -> Result<Self, ClientError> {
        let client = Self::new(config);
        client.connect().await?;
        Ok(client)
    }

    /// Connects to the first reachable endpoint of `cluster`.
    pub async fn open_cluster<F>(cluster: &ClusterConfig, configure: F) -> Result<Self, ClientError>
    where
        F: Fn(Endpoint) -> ConnectionConfig,
    {
        let (conn, endpoint) = cluster.select_connection(configure).await?;
        tracing::info!("Connected to {}", endpoint);
        let client = Self::from_connection(conn);
        client.spawn_read_loop();
        Ok(client)
    }

    /// Connects to the server and starts the background read loop.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await?;
        self.spawn_read_loop();
        Ok(())
    }

    fn spawn_read_loop(&self) {
        let conn = self.conn.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = conn.read_loop().await {
                tracing::debug!("read_loop ended: {}", e);
            }
        });
        if let Some(previous) = self.lock_read_task().replace(handle) {
            previous.abort();
        }
    }

    fn lock_read_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.read_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Returns the endpoint this client talks to.
    pub fn endpoint(&self) -> &Endpoint {
        self.conn.endpoint()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        if let Some(handle) = self.lock_read_task().take() {
            handle.abort();
        }
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Evaluates a script and returns the assembled result as raw JSON.
    ///
    /// Returns an empty payload when the server reports no content.
    pub async fn submit(&self, query: &str) -> Result<Bytes, ClientError> {
        self.submit_request(Request::query(query)).await
    }

    /// Evaluates a script and decodes the assembled result.
    pub async fn submit_as<T: DeserializeOwned>(&self, query: &str) -> Result<T, ClientError> {
        let payload = self.submit(query).await?;
        let body: &[u8] = if payload.is_empty() { b"null" } else { &payload };
        Ok(serde_json::from_slice(body)?)
    }

    /// Sends a fully-formed request and returns the assembled result.
    pub async fn submit_request(&self, request: Request) -> Result<Bytes, ClientError> {
        let mut responses = self.conn.register(request.request_id)?;
        self.exchange(request, &mut responses).await
    }

    async fn exchange(
        &self,
        request: Request,
        responses: &mut PendingResponses,
    ) -> Result<Bytes, ClientError> {
        self.conn.send(&request).await?;

        let timeout = self.conn.config().request_timeout;
        let mut exchange = Exchange::new();
        loop {
            let response = responses.next(timeout).await?;
            match exchange.on_response(response)? {
                Step::Continue => continue,
                Step::Complete(payload) => {
                    tracing::debug!(
                        "Request id={} complete ({} bytes)",
                        responses.request_id(),
                        payload.len()
                    );
                    return Ok(payload);
                }
                Step::Authenticate(challenge_id) => {
                    tracing::debug!("Server requested authentication for id={}", challenge_id);
                    let auth = AuthInfo::resolve(challenge_id, &self.conn.config().auth)?;
                    self.conn.send(&auth.into_request()).await?;
                }
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_read_task().take() {
            handle.abort();
        }
    }
}
