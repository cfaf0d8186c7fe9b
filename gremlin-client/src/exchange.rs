//! Response handling for a single logical request.
//!
//! An [`Exchange`] is fed every [`Response`] correlated to one request, in
//! arrival order, and decides whether to keep reading, answer an
//! authentication challenge, or finish. Batched results (`206` frames
//! followed by a final `200`) are concatenated so callers always see one
//! flat JSON array.

use crate::error::ClientError;
use bytes::Bytes;
use gremlin_protocol::{Response, StatusCode};
use serde_json::value::RawValue;
use uuid::Uuid;

/// What the caller should do after feeding a response.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// More frames follow.
    Continue,
    /// The exchange resolved to this payload.
    Complete(Bytes),
    /// Send SASL credentials under this request ID, then keep reading.
    Authenticate(Uuid),
}

/// State of one request/response exchange.
#[derive(Debug, Default)]
pub struct Exchange {
    accumulated: Vec<Box<RawValue>>,
    batching: bool,
    challenged: bool,
}

impl Exchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a `206` frame has been seen.
    pub fn is_batching(&self) -> bool {
        self.batching
    }

    /// Number of result elements buffered from partial frames.
    pub fn buffered(&self) -> usize {
        self.accumulated.len()
    }

    /// Applies one response.
    pub fn on_response(&mut self, response: Response) -> Result<Step, ClientError> {
        let code = response.status.code;
        match code {
            StatusCode::NoContent => Ok(Step::Complete(Bytes::new())),

            StatusCode::Authenticate => {
                if self.batching {
                    return Err(ClientError::UnexpectedStatus {
                        code,
                        reason: "authentication challenge in the middle of a batched result",
                    });
                }
                if self.challenged {
                    return Err(ClientError::UnexpectedStatus {
                        code,
                        reason: "server challenged again after the SASL response",
                    });
                }
                self.challenged = true;
                Ok(Step::Authenticate(response.request_id))
            }

            StatusCode::PartialContent => {
                self.batching = true;
                self.append(response)?;
                Ok(Step::Continue)
            }

            StatusCode::Success if self.batching => {
                self.append(response)?;
                let merged = serde_json::to_vec(&self.accumulated)?;
                self.accumulated.clear();
                Ok(Step::Complete(Bytes::from(merged)))
            }

            StatusCode::Success => {
                let data = result_data(response)?;
                Ok(Step::Complete(Bytes::copy_from_slice(data.get().as_bytes())))
            }

            StatusCode::Unauthorized
            | StatusCode::Forbidden
            | StatusCode::MalformedRequest
            | StatusCode::InvalidRequestArguments
            | StatusCode::ServerError
            | StatusCode::ScriptEvaluationError
            | StatusCode::ServerTimeout
            | StatusCode::ServerSerializationError
            | StatusCode::Unknown(_) => Err(ClientError::ServerError {
                code,
                message: code.describe(),
                detail: response.status.message,
            }),
        }
    }

    fn append(&mut self, response: Response) -> Result<(), ClientError> {
        let data = result_data(response)?;
        let items: Vec<Box<RawValue>> = serde_json::from_str(data.get()).map_err(|e| {
            ClientError::MalformedResponse(format!("batched result data is not an array: {}", e))
        })?;
        tracing::debug!(
            "Appending {} item(s) to {} buffered",
            items.len(),
            self.accumulated.len()
        );
        self.accumulated.extend(items);
        Ok(())
    }
}

fn result_data(response: Response) -> Result<Box<RawValue>, ClientError> {
    let code = response.status.code;
    response
        .result
        .map(|result| result.data)
        .ok_or_else(|| ClientError::MalformedResponse(format!("{} frame without a result", code)))
}
