//! One-shot query execution and output formatting.

use colored::Colorize;
use gremlin_client::Client;
use gremlin_protocol::{Bindings, Processor, Request};
use serde_json::Value;

/// Options for a single script evaluation.
#[derive(Debug, Default, Clone)]
pub struct QueryOptions {
    pub bindings: Option<Bindings>,
    pub session: Option<String>,
    pub batch_size: Option<u32>,
    pub pretty: bool,
}

/// Builds the request for a script and its options.
pub fn build_request(script: &str, options: &QueryOptions) -> Request {
    let mut request = Request::query(script);
    if let Some(bindings) = &options.bindings {
        request = request.with_bindings(bindings.clone());
    }
    if let Some(session) = &options.session {
        request = request
            .with_processor(Processor::Session)
            .with_session(session.clone());
    }
    if let Some(batch_size) = options.batch_size {
        request = request.with_batch_size(batch_size);
    }
    request
}

/// Evaluates a script and returns the formatted output.
pub async fn execute(
    client: &Client,
    script: &str,
    options: &QueryOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let payload = client.submit_request(build_request(script, options)).await?;
    format_payload(&payload, options.pretty)
}

/// Formats a result payload. An empty payload means the server had no content.
pub fn format_payload(payload: &[u8], pretty: bool) -> Result<String, Box<dyn std::error::Error>> {
    if payload.is_empty() {
        return Ok("(no content)".dimmed().to_string());
    }
    if !pretty {
        return Ok(String::from_utf8_lossy(payload).into_owned());
    }
    let value: Value = serde_json::from_slice(payload)?;
    Ok(format_json(&value))
}

/// Parses a bindings argument: a JSON object, or @file.json to read from file.
pub fn parse_bindings(arg: &str) -> Result<Bindings, Box<dyn std::error::Error>> {
    match parse_json_arg(arg)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(format!("bindings must be a JSON object, got {}", other).into()),
    }
}

fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Formats JSON for display.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
