//! # gremlin-client
//!
//! Client library for Gremlin Server.
//!
//! This crate provides:
//! - WebSocket connections with request multiplexing
//! - Reassembly of batched (`206`) results into one JSON array
//! - SASL PLAIN answers to authentication challenges
//! - Ordered failover across a list of servers
//! - Optional TLS support

pub mod auth;
pub mod client;
pub mod cluster;
pub mod config;
pub mod connection;
pub mod error;
pub mod exchange;
pub mod stream;
pub mod tls;

pub use auth::{AuthInfo, AuthSource};
pub use client::Client;
pub use cluster::{ClusterConfig, Endpoint};
pub use config::Config;
pub use connection::{Connection, ConnectionConfig, TlsClientConfig};
pub use error::ClientError;
pub use exchange::{Exchange, Step};
