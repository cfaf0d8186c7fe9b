//! Response status codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status codes reported by Gremlin Server in `status.code`.
///
/// The set is closed; any code the server sends that is not listed here
/// decodes to [`StatusCode::Unknown`] and is reported as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum StatusCode {
    /// Final frame of a result.
    Success,
    /// Request succeeded with no result to return.
    NoContent,
    /// More frames follow for the same request.
    PartialContent,
    Unauthorized,
    Forbidden,
    /// The server wants SASL credentials before it runs the request.
    Authenticate,
    MalformedRequest,
    InvalidRequestArguments,
    ServerError,
    ScriptEvaluationError,
    ServerTimeout,
    ServerSerializationError,
    Unknown(u16),
}

/// Fallback message for codes outside the table.
pub const UNKNOWN_ERROR_MESSAGE: &str = "an unknown error occurred";

impl StatusCode {
    /// Returns the numeric code.
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Success => 200,
            StatusCode::NoContent => 204,
            StatusCode::PartialContent => 206,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::Authenticate => 407,
            StatusCode::MalformedRequest => 498,
            StatusCode::InvalidRequestArguments => 499,
            StatusCode::ServerError => 500,
            StatusCode::ScriptEvaluationError => 597,
            StatusCode::ServerTimeout => 598,
            StatusCode::ServerSerializationError => 599,
            StatusCode::Unknown(code) => *code,
        }
    }

    /// Returns the fixed error message for codes that signal failure.
    ///
    /// Control-flow codes (success, partial content, no content,
    /// authenticate) have no entry.
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            StatusCode::Success
            | StatusCode::NoContent
            | StatusCode::PartialContent
            | StatusCode::Authenticate => None,
            StatusCode::Unauthorized => Some(
                "unauthorized: the request attempted to access resources that the requesting user did not have access to",
            ),
            StatusCode::Forbidden => Some("forbidden: the server refused the request"),
            StatusCode::MalformedRequest => {
                Some("malformed request: the request message was not properly formatted")
            }
            StatusCode::InvalidRequestArguments => Some(
                "invalid request arguments: the request message was parseable but the arguments supplied were invalid",
            ),
            StatusCode::ServerError => Some("server error: a general server error occurred"),
            StatusCode::ScriptEvaluationError => Some(
                "script evaluation error: the script submitted for processing evaluated on the server with errors",
            ),
            StatusCode::ServerTimeout => Some(
                "server timeout: the server exceeded its time allowed to process the request",
            ),
            StatusCode::ServerSerializationError => Some(
                "server serialization error: the server was not capable of serializing an object",
            ),
            StatusCode::Unknown(_) => None,
        }
    }

    /// Returns the table message, or the generic message for unknown codes.
    pub fn describe(&self) -> &'static str {
        self.error_message().unwrap_or(UNKNOWN_ERROR_MESSAGE)
    }

    /// Returns whether a server-side retry might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StatusCode::ServerTimeout | StatusCode::ServerError)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        match code {
            200 => StatusCode::Success,
            204 => StatusCode::NoContent,
            206 => StatusCode::PartialContent,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            407 => StatusCode::Authenticate,
            498 => StatusCode::MalformedRequest,
            499 => StatusCode::InvalidRequestArguments,
            500 => StatusCode::ServerError,
            597 => StatusCode::ScriptEvaluationError,
            598 => StatusCode::ServerTimeout,
            599 => StatusCode::ServerSerializationError,
            other => StatusCode::Unknown(other),
        }
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.as_u16()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "SUCCESS",
            StatusCode::NoContent => "NO_CONTENT",
            StatusCode::PartialContent => "PARTIAL_CONTENT",
            StatusCode::Unauthorized => "UNAUTHORIZED",
            StatusCode::Forbidden => "FORBIDDEN",
            StatusCode::Authenticate => "AUTHENTICATE",
            StatusCode::MalformedRequest => "MALFORMED_REQUEST",
            StatusCode::InvalidRequestArguments => "INVALID_REQUEST_ARGUMENTS",
            StatusCode::ServerError => "SERVER_ERROR",
            StatusCode::ScriptEvaluationError => "SCRIPT_EVALUATION_ERROR",
            StatusCode::ServerTimeout => "SERVER_TIMEOUT",
            StatusCode::ServerSerializationError => "SERVER_SERIALIZATION_ERROR",
            StatusCode::Unknown(_) => "UNKNOWN",
        };
        write!(f, "{} {}", self.as_u16(), name)
    }
}
