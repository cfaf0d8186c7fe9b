//! SASL PLAIN answers to server authentication challenges.
//!
//! Credentials are only looked up when a challenge arrives. The first
//! configured [`AuthSource`] that yields both a user and a password wins.

use crate::error::ClientError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gremlin_protocol::Request;
use std::fmt;
use uuid::Uuid;

/// Default environment variable for the user name.
pub const USER_ENV: &str = "GREMLIN_USER";

/// Default environment variable for the password.
pub const PASS_ENV: &str = "GREMLIN_PASS";

/// Where credentials come from, in priority order.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthSource {
    /// Explicit credentials.
    UserPass { user: String, pass: String },
    /// Credentials read from two environment variables at challenge time.
    Env { user_var: String, pass_var: String },
}

impl AuthSource {
    pub fn user_pass(user: impl Into<String>, pass: impl Into<String>) -> Self {
        AuthSource::UserPass {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Reads `GREMLIN_USER` and `GREMLIN_PASS`.
    pub fn env() -> Self {
        Self::env_vars(USER_ENV, PASS_ENV)
    }

    pub fn env_vars(user_var: impl Into<String>, pass_var: impl Into<String>) -> Self {
        AuthSource::Env {
            user_var: user_var.into(),
            pass_var: pass_var.into(),
        }
    }

    fn lookup(&self) -> Option<(String, String)> {
        match self {
            AuthSource::UserPass { user, pass } => Some((user.clone(), pass.clone())),
            AuthSource::Env { user_var, pass_var } => {
                let user = std::env::var(user_var).ok()?;
                let pass = std::env::var(pass_var).ok()?;
                Some((user, pass))
            }
        }
    }
}

impl fmt::Debug for AuthSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSource::UserPass { user, .. } => f
                .debug_struct("UserPass")
                .field("user", user)
                .field("pass", &"<redacted>")
                .finish(),
            AuthSource::Env { user_var, pass_var } => f
                .debug_struct("Env")
                .field("user_var", user_var)
                .field("pass_var", pass_var)
                .finish(),
        }
    }
}

/// Credentials bound to one challenge. Not kept past the handshake.
#[derive(Clone)]
pub struct AuthInfo {
    pub challenge_id: Uuid,
    pub user: String,
    pass: String,
}

impl AuthInfo {
    pub fn new(challenge_id: Uuid, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            challenge_id,
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Takes credentials from the first source that supplies both values.
    pub fn resolve(challenge_id: Uuid, sources: &[AuthSource]) -> Result<Self, ClientError> {
        sources
            .iter()
            .find_map(AuthSource::lookup)
            .map(|(user, pass)| Self::new(challenge_id, user, pass))
            .ok_or_else(|| {
                ClientError::Config(format!(
                    "server requested authentication but no credentials are configured \
                     (set {} and {}, or pass a user and password)",
                    USER_ENV, PASS_ENV
                ))
            })
    }

    /// Base64 of `\0<user>\0<pass>`.
    pub fn sasl(&self) -> String {
        let mut blob = Vec::with_capacity(2 + self.user.len() + self.pass.len());
        blob.push(0);
        blob.extend_from_slice(self.user.as_bytes());
        blob.push(0);
        blob.extend_from_slice(self.pass.as_bytes());
        STANDARD.encode(blob)
    }

    /// Builds the `authentication` request answering the challenge.
    pub fn into_request(self) -> Request {
        Request::authentication(self.challenge_id, self.sasl())
    }
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("challenge_id", &self.challenge_id)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}
