//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via GREMLIN_CONFIG)
//! 3. Environment variables

use crate::auth::{AuthSource, PASS_ENV, USER_ENV};
use crate::cluster::{ClusterConfig, Endpoint, SERVERS_ENV};
use crate::connection::{ConnectionConfig, TlsClientConfig};
use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "GREMLIN_CONFIG";

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Candidate servers, tried in order.
    pub servers: Vec<String>,
    /// Network configuration.
    pub network: NetworkConfig,
    /// Credentials.
    pub auth: AuthConfig,
    /// TLS configuration.
    pub tls: TlsClientConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ClientError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read config file {:?}: {}", path, e))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("invalid config file {:?}: {}", path, e)))
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(servers) = std::env::var(SERVERS_ENV) {
            let servers: Vec<String> = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !servers.is_empty() {
                self.servers = servers;
            }
        }

        self.network.apply_env_overrides();
        self.auth.apply_env_overrides();

        if let Ok(tls) = std::env::var("GREMLIN_TLS") {
            self.tls.enabled = tls == "1" || tls.to_lowercase() == "true";
        }
        if let Ok(path) = std::env::var("GREMLIN_CA_CERT") {
            self.tls.ca_cert_path = Some(path.into());
            self.tls.enabled = true;
        }
    }

    /// Builds the cluster from the configured servers.
    pub fn cluster(&self) -> Result<ClusterConfig, ClientError> {
        Ok(ClusterConfig::configure(&self.servers)?.with_select_timeout(self.network.select_timeout()))
    }

    /// Credential sources in priority order: explicit, then environment.
    pub fn auth_sources(&self) -> Vec<AuthSource> {
        let mut sources = Vec::new();
        if let (Some(user), Some(pass)) = (&self.auth.user, &self.auth.pass) {
            sources.push(AuthSource::user_pass(user, pass));
        }
        if self.auth.from_env {
            sources.push(AuthSource::env());
        }
        sources
    }

    /// Connection settings for one endpoint.
    pub fn connection_config(&self, endpoint: Endpoint) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(endpoint)
            .with_connect_timeout(self.network.connect_timeout());
        if let Some(timeout) = self.network.request_timeout() {
            config = config.with_request_timeout(timeout);
        }
        for source in self.auth_sources() {
            config = config.with_auth_source(source);
        }
        if self.tls.enabled {
            config = config.with_tls(self.tls.clone());
        }
        config
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Connect timeout for a single endpoint, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-endpoint budget during failover, in milliseconds.
    pub select_timeout_ms: u64,
    /// Wait limit for each response frame, in milliseconds. Unset waits forever.
    pub request_timeout_ms: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            select_timeout_ms: 1_000,
            request_timeout_ms: None,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(timeout) = std::env::var("GREMLIN_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.connect_timeout_ms = ms;
            }
        }

        if let Ok(timeout) = std::env::var("GREMLIN_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.request_timeout_ms = Some(ms);
            }
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn select_timeout(&self) -> Duration {
        Duration::from_millis(self.select_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub user: Option<String>,
    pub pass: Option<String>,
    /// Fall back to GREMLIN_USER / GREMLIN_PASS at challenge time.
    pub from_env: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user: None,
            pass: None,
            from_env: true,
        }
    }
}

impl AuthConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(user) = std::env::var(USER_ENV) {
            self.user = Some(user);
        }
        if let Ok(pass) = std::env::var(PASS_ENV) {
            self.pass = Some(pass);
        }
    }
}
