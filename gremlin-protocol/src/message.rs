//! JSON message types for Gremlin requests and responses.

use crate::status::StatusCode;
use crate::DEFAULT_LANGUAGE;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Variable bindings passed alongside a script.
pub type Bindings = HashMap<String, Value>;

/// Request operations understood by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Evaluate a script.
    Eval,
    /// Answer a SASL challenge.
    Authentication,
}

/// Server-side op processor that handles a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Processor {
    /// Sessionless processor chosen by the server.
    #[default]
    #[serde(rename = "")]
    Default,
    #[serde(rename = "traversal")]
    Traversal,
    #[serde(rename = "session")]
    Session,
}

/// Sparse argument bag. Unset fields are left out of the wire form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestArgs {
    /// Script text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gremlin: Option<String>,

    /// Script language tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Session identifier (for the session processor).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Bindings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebindings: Option<Bindings>,

    /// Base64 SASL credentials, only on `authentication` requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sasl: Option<String>,

    /// Hint for how many results the server puts in each frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_transaction: Option<bool>,

    /// Logical to physical graph name mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<HashMap<String, String>>,
}

/// A logical request.
///
/// Built with the consuming `with_*` methods; each returns an updated value,
/// so a request that has been cloned and reused never aliases another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Unique request ID for correlation.
    pub request_id: Uuid,

    pub op: Operation,

    #[serde(default)]
    pub processor: Processor,

    #[serde(default)]
    pub args: RequestArgs,
}

impl Request {
    pub fn new(request_id: Uuid, op: Operation) -> Self {
        Self {
            request_id,
            op,
            processor: Processor::Default,
            args: RequestArgs::default(),
        }
    }

    /// Builds an `eval` request for a script, with a fresh request ID.
    pub fn query(gremlin: impl Into<String>) -> Self {
        let mut request = Self::new(Uuid::new_v4(), Operation::Eval);
        request.args.gremlin = Some(gremlin.into());
        request.args.language = Some(DEFAULT_LANGUAGE.to_string());
        request
    }

    /// Builds the answer to a SASL challenge. The ID must be the challenge's.
    pub fn authentication(challenge_id: Uuid, sasl: impl Into<String>) -> Self {
        let mut request = Self::new(challenge_id, Operation::Authentication);
        request.processor = Processor::Traversal;
        request.args.sasl = Some(sasl.into());
        request
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_processor(mut self, processor: Processor) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.args.bindings = Some(bindings);
        self
    }

    /// Adds a single binding, keeping any already set.
    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args
            .bindings
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_rebindings(mut self, rebindings: Bindings) -> Self {
        self.args.rebindings = Some(rebindings);
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.args.session = Some(session.into());
        self
    }

    pub fn with_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.args.aliases = Some(aliases);
        self
    }

    pub fn with_manage_transaction(mut self, flag: bool) -> Self {
        self.args.manage_transaction = Some(flag);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.args.batch_size = Some(batch_size);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.args.language = Some(language.into());
        self
    }
}

/// Response status block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// Drives control flow on the client.
    pub code: StatusCode,

    #[serde(default)]
    pub message: String,

    /// Diagnostic metadata (exception class, stack trace, ...).
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// Result block. `data` stays undecoded until the status code says what it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseResult {
    pub data: Box<RawValue>,

    #[serde(default)]
    pub meta: HashMap<String, Value>,
}

impl ResponseResult {
    pub fn new(data: Box<RawValue>) -> Self {
        Self {
            data,
            meta: HashMap::new(),
        }
    }
}

/// One inbound message. A single request may produce several.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Request ID this response correlates to.
    pub request_id: Uuid,

    pub status: ResponseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseResult>,
}

impl Response {
    pub fn new(request_id: Uuid, code: StatusCode) -> Self {
        Self {
            request_id,
            status: ResponseStatus {
                code,
                message: String::new(),
                attributes: HashMap::new(),
            },
            result: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status.message = message.into();
        self
    }

    pub fn with_data(mut self, data: Box<RawValue>) -> Self {
        self.result = Some(ResponseResult::new(data));
        self
    }

    pub fn code(&self) -> StatusCode {
        self.status.code
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response {{ requestId: {}, status: {}",
            self.request_id, self.status.code
        )?;
        if !self.status.message.is_empty() {
            write!(f, " ({})", self.status.message)?;
        }
        match &self.result {
            Some(result) => write!(f, ", data: {} }}", result.data.get()),
            None => write!(f, " }}"),
        }
    }
}
