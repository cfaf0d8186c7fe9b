//! Encoder and decoder for Gremlin messages.
//!
//! Outbound layout:
//!
//! ```text
//! +----------+---------------------------------------+-----------+
//! | mime len | mime type                             | JSON body |
//! | 1 byte   | "application/vnd.gremlin-v2.0+json"   |           |
//! +----------+---------------------------------------+-----------+
//! ```
//!
//! Inbound messages are plain JSON with no prefix.

use crate::error::ProtocolError;
use crate::message::{Operation, Processor, Request, RequestArgs, Response};
use crate::MIME_TYPE;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const UUID_TYPE_TAG: &str = "g:UUID";

/// GraphSON typed UUID: `{"@type": "g:UUID", "@value": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
struct TypedUuid {
    #[serde(rename = "@type")]
    type_tag: String,
    #[serde(rename = "@value")]
    value: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequestRef<'a> {
    request_id: TypedUuid,
    op: Operation,
    processor: Processor,
    args: &'a RequestArgs,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    request_id: TypedUuid,
    op: Operation,
    #[serde(default)]
    processor: Processor,
    #[serde(default)]
    args: RequestArgs,
}

/// Encodes outbound messages.
pub struct Encoder;

impl Encoder {
    /// Encodes a request: mime length byte, mime type, JSON body.
    pub fn encode_request(request: &Request) -> Result<Bytes, ProtocolError> {
        let mime = MIME_TYPE.as_bytes();
        let mime_len =
            u8::try_from(mime.len()).map_err(|_| ProtocolError::MimeTypeTooLong(mime.len()))?;

        let wire = WireRequestRef {
            request_id: TypedUuid {
                type_tag: UUID_TYPE_TAG.to_string(),
                value: request.request_id,
            },
            op: request.op,
            processor: request.processor,
            args: &request.args,
        };
        let body = serde_json::to_vec(&wire).map_err(ProtocolError::Encode)?;

        let mut buf = BytesMut::with_capacity(1 + mime.len() + body.len());
        buf.put_u8(mime_len);
        buf.put_slice(mime);
        buf.put_slice(&body);
        Ok(buf.freeze())
    }

    /// Encodes a response as plain JSON, the way the server sends it.
    pub fn encode_response(response: &Response) -> Result<Bytes, ProtocolError> {
        let body = serde_json::to_vec(response).map_err(ProtocolError::Encode)?;
        Ok(Bytes::from(body))
    }
}

/// Decodes inbound messages.
pub struct Decoder;

impl Decoder {
    /// Decodes a server response. `result.data` is left undecoded.
    pub fn decode_response(data: &[u8]) -> Result<Response, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    /// Decodes a request produced by [`Encoder::encode_request`].
    pub fn decode_request(data: &[u8]) -> Result<Request, ProtocolError> {
        let (&mime_len, rest) = data
            .split_first()
            .ok_or(ProtocolError::Truncated { needed: 1 })?;
        let mime_len = mime_len as usize;
        if rest.len() < mime_len {
            return Err(ProtocolError::Truncated {
                needed: mime_len - rest.len(),
            });
        }

        let (mime, body) = rest.split_at(mime_len);
        let mime = std::str::from_utf8(mime).map_err(|_| ProtocolError::InvalidUtf8)?;
        if mime != MIME_TYPE {
            return Err(ProtocolError::InvalidMimeType {
                expected: MIME_TYPE,
                actual: mime.to_string(),
            });
        }

        let wire: WireRequest = serde_json::from_slice(body).map_err(ProtocolError::Decode)?;
        Ok(Request {
            request_id: wire.request_id.value,
            op: wire.op,
            processor: wire.processor,
            args: wire.args,
        })
    }
}
