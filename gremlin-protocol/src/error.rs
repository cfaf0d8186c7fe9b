//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding requests or decoding responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("mime type too long: {0} bytes (max 255)")]
    MimeTypeTooLong(usize),

    #[error("invalid mime type prefix: expected {expected:?}, got {actual:?}")]
    InvalidMimeType { expected: &'static str, actual: String },

    #[error("truncated message: need {needed} more bytes")]
    Truncated { needed: usize },

    #[error("invalid UTF-8 in message")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Returns whether this error happened while decoding inbound data.
    pub fn is_decode(&self) -> bool {
        !matches!(self, ProtocolError::Encode(_) | ProtocolError::MimeTypeTooLong(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MimeTypeTooLong(300);
        assert!(err.to_string().contains("300"));

        let err = ProtocolError::InvalidMimeType {
            expected: crate::MIME_TYPE,
            actual: "text/plain".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("text/plain"));
        assert!(msg.contains("gremlin-v2.0"));

        let err = ProtocolError::Truncated { needed: 12 };
        assert!(err.to_string().contains("12"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_is_decode() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(ProtocolError::Decode(json_err).is_decode());
        assert!(ProtocolError::InvalidUtf8.is_decode());
        assert!(!ProtocolError::MimeTypeTooLong(256).is_decode());
    }
}
