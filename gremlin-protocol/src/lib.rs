//! # gremlin-protocol
//!
//! Wire protocol for Gremlin Server (GraphSON v2 over WebSocket).
//!
//! This crate provides:
//! - Request envelopes with the mime-type prefix the server expects
//! - Response envelopes with undecoded result data
//! - Status codes and their human-readable messages
//! - A request builder for traversal queries

pub mod codec;
pub mod error;
pub mod message;
pub mod status;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use message::{
    Bindings, Operation, Processor, Request, RequestArgs, Response, ResponseResult, ResponseStatus,
};
pub use status::StatusCode;

/// Mime type announcing the GraphSON v2 sub-protocol.
pub const MIME_TYPE: &str = "application/vnd.gremlin-v2.0+json";

/// Language tag sent with `eval` requests.
pub const DEFAULT_LANGUAGE: &str = "gremlin-groovy";

/// Default port for Gremlin Server.
pub const DEFAULT_PORT: u16 = 8182;
