//! Decoded request messages.
//!
//! A request is a JSON object that always carries `method` and `seqNum`.
//! Service requests add an `id` naming the text service plus whatever fields
//! the method needs; those fields are kept verbatim so handlers see exactly
//! what the client sent.

use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::FrameError;

/// Field holding the method name.
pub const METHOD_FIELD: &str = "method";
/// Field holding the client sequence number.
pub const SEQ_NUM_FIELD: &str = "seqNum";
/// Field holding the service identifier.
pub const ID_FIELD: &str = "id";

/// A validated request object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Request {
    fields: Map<String, Value>,
}

impl Request {
    /// Validates a decoded JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the document is not an object, has no
    /// string `method`, or has no integer `seqNum`.
    pub fn from_value(value: Value) -> Result<Self, FrameError> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => return Err(FrameError::not_an_object(&other)),
        };
        let method = fields
            .get(METHOD_FIELD)
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingMethod)?;
        if fields.get(SEQ_NUM_FIELD).and_then(Value::as_i64).is_none() {
            return Err(FrameError::invalid_seq_num(method));
        }
        Ok(Self { fields })
    }

    /// Parses and validates a complete JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MalformedJson`] for invalid JSON and the
    /// validation errors of [`Request::from_value`] otherwise.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let value = serde_json::from_slice(bytes).map_err(FrameError::from_json_error)?;
        Self::from_value(value)
    }

    /// Method name.
    pub fn method(&self) -> &str {
        self.fields
            .get(METHOD_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Client sequence number echoed in the response.
    pub fn seq_num(&self) -> i64 {
        self.fields
            .get(SEQ_NUM_FIELD)
            .and_then(Value::as_i64)
            .unwrap_or_default()
    }

    /// Service identifier, when the request names one.
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Looks up an arbitrary field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Every field as sent, including `method` and `seqNum`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Fields that describe the session rather than the call itself.
    pub fn session_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields
            .iter()
            .filter(|(key, _)| !is_control_field(key))
    }
}

fn is_control_field(key: &str) -> bool {
    key == METHOD_FIELD || key == SEQ_NUM_FIELD
}
