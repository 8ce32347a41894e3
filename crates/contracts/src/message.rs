//! Inbound messages and the JSON envelope they carry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ContractError;

/// Where and how to acknowledge a message
///
/// Supplied per message by the ingestion source, so a batch may mix
/// messages from different source queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AckToken {
    /// Source queue the message was received from
    pub source: String,
    /// Opaque receipt handle scoped to `source`
    pub receipt: String,
}

impl AckToken {
    pub fn new(source: impl Into<String>, receipt: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            receipt: receipt.into(),
        }
    }
}

/// A message as delivered by the ingestion source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Raw body, forwarded verbatim
    pub body: String,
    /// Acknowledgment target
    pub ack: AckToken,
}

impl InboundMessage {
    pub fn new(body: impl Into<String>, ack: AckToken) -> Self {
        Self {
            body: body.into(),
            ack,
        }
    }
}

/// Parsed view of a message body
///
/// Only `request_id` is interpreted; every other field passes through
/// untouched because the original body string is what gets forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Logical id used as the idempotency key
    pub request_id: String,
}

impl Envelope {
    /// Field holding the logical id
    pub const REQUEST_ID_FIELD: &'static str = "request_id";

    /// Parse an envelope out of a message body
    ///
    /// # Errors
    /// [`ContractError::InvalidEnvelope`] when the body is not a JSON object
    /// or `request_id` is missing, blank, or not a string.
    pub fn parse(body: &str) -> Result<Self, ContractError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ContractError::invalid_envelope(format!("malformed JSON: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| ContractError::invalid_envelope("envelope is not a JSON object"))?;

        match object.get(Self::REQUEST_ID_FIELD) {
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(Self {
                request_id: id.clone(),
            }),
            Some(Value::String(_)) => Err(ContractError::invalid_envelope("request_id is blank")),
            Some(Value::Null) | None => {
                Err(ContractError::invalid_envelope("missing request_id"))
            }
            Some(other) => Err(ContractError::invalid_envelope(format!(
                "request_id must be a string, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
