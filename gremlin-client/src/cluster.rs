//! Server endpoints and ordered failover between them.
//!
//! A [`ClusterConfig`] is built once, before the first connection attempt,
//! and is read-only afterwards. Selection walks the endpoints in the order
//! they were configured and returns the first one that accepts a connection
//! within a short timeout. There is no randomization, weighting, or second
//! pass.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use gremlin_protocol::DEFAULT_PORT;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio_tungstenite::tungstenite::http::Uri;

/// Environment variable holding a comma-separated server list.
pub const SERVERS_ENV: &str = "GREMLIN_SERVERS";

/// Per-endpoint connection timeout used during selection.
pub const DEFAULT_SELECT_TIMEOUT: Duration = Duration::from_secs(1);

/// A validated `ws://` or `wss://` server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    uri: Uri,
    host: String,
    port: u16,
    secure: bool,
}

impl Endpoint {
    /// Parses an endpoint such as `ws://localhost:8182/gremlin`.
    ///
    /// The port defaults to 8182 when omitted.
    pub fn parse(s: &str) -> Result<Self, ClientError> {
        let s = s.trim();
        let uri: Uri = s
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid server address {:?}: {}", s, e)))?;

        let secure = match uri.scheme_str() {
            Some("ws") => false,
            Some("wss") => true,
            Some(other) => {
                return Err(ClientError::Config(format!(
                    "invalid server address {:?}: unsupported scheme {:?} (expected ws or wss)",
                    s, other
                )))
            }
            None => {
                return Err(ClientError::Config(format!(
                    "invalid server address {:?}: missing scheme (expected ws:// or wss://)",
                    s
                )))
            }
        };

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ClientError::Config(format!("invalid server address {:?}: missing host", s)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = uri.port_u16().unwrap_or(DEFAULT_PORT);

        Ok(Self {
            uri,
            host,
            port,
            secure,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether the scheme is `wss`.
    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl FromStr for Endpoint {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// Ordered list of candidate servers.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    endpoints: Vec<Endpoint>,
    select_timeout: Duration,
}

impl ClusterConfig {
    /// Creates a cluster from already-parsed endpoints.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ClientError> {
        if endpoints.is_empty() {
            return Err(ClientError::Config("no servers configured".to_string()));
        }
        Ok(Self {
            endpoints,
            select_timeout: DEFAULT_SELECT_TIMEOUT,
        })
    }

    /// Uses `addresses` when non-empty, otherwise reads `GREMLIN_SERVERS`.
    pub fn configure<S: AsRef<str>>(addresses: &[S]) -> Result<Self, ClientError> {
        Self::configure_from(addresses, SERVERS_ENV)
    }

    /// Uses `addresses` when non-empty, otherwise reads the named variable.
    pub fn configure_from<S: AsRef<str>>(
        addresses: &[S],
        env_var: &str,
    ) -> Result<Self, ClientError> {
        if addresses.is_empty() {
            return Self::from_env_var(env_var);
        }
        let endpoints = addresses
            .iter()
            .map(|addr| Endpoint::parse(addr.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(endpoints)
    }

    /// Reads the server list from `GREMLIN_SERVERS`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_env_var(SERVERS_ENV)
    }

    /// Reads the server list from the named environment variable.
    pub fn from_env_var(name: &str) -> Result<Self, ClientError> {
        let value = std::env::var(name).unwrap_or_default();
        if value.trim().is_empty() {
            return Err(ClientError::Config(format!(
                "no servers set; configure servers to connect to using the {} environment variable",
                name
            )));
        }
        Self::parse(&value)
    }

    /// Parses a comma-separated list, e.g. `ws://server1:8182, ws://server2:8182`.
    pub fn parse(conn_string: &str) -> Result<Self, ClientError> {
        let endpoints = conn_string
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Endpoint::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(ClientError::Config(
                "connection string is not in expected format, e.g. 'ws://server1:8182, ws://server2:8182'"
                    .to_string(),
            ));
        }
        Self::new(endpoints)
    }

    pub fn with_select_timeout(mut self, timeout: Duration) -> Self {
        self.select_timeout = timeout;
        self
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn select_timeout(&self) -> Duration {
        self.select_timeout
    }

    /// Connects to the first endpoint that answers.
    ///
    /// `configure` builds the connection settings for each candidate.
    pub async fn select_connection<F>(
        &self,
        configure: F,
    ) -> Result<(Connection, Endpoint), ClientError>
    where
        F: Fn(Endpoint) -> ConnectionConfig,
    {
        self.select_with(|endpoint| {
            let conn = Connection::new(configure(endpoint.clone()));
            async move {
                conn.connect().await?;
                Ok::<_, ClientError>(conn)
            }
        })
        .await
    }

    /// Ordered failover over an arbitrary dial function.
    pub async fn select_with<T, F, Fut>(&self, mut dial: F) -> Result<(T, Endpoint), ClientError>
    where
        F: FnMut(&Endpoint) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        for endpoint in &self.endpoints {
            tracing::debug!("Trying {}...", endpoint);
            match tokio::time::timeout(self.select_timeout, dial(endpoint)).await {
                Ok(Ok(conn)) => {
                    tracing::debug!("Selected {}", endpoint);
                    return Ok((conn, endpoint.clone()));
                }
                Ok(Err(e)) => tracing::warn!("Connection to {} failed: {}", endpoint, e),
                Err(_) => tracing::warn!(
                    "Connection to {} timed out after {:?}",
                    endpoint,
                    self.select_timeout
                ),
            }
        }

        Err(ClientError::NoServerAvailable {
            attempted: self.endpoints.len(),
        })
    }
}
