//! Error types for framing and request validation failures.
//!
//! Every variant is fatal for the connection: the dispatcher answers a
//! [`FrameError`] with `CloseSocket`. Incomplete input is not an error and
//! never reaches this type.

use thiserror::Error;

/// Reasons the buffered byte stream can no longer yield a valid request.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The buffer does not hold a syntactically valid JSON document.
    #[error("malformed request: {message}")]
    MalformedJson {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but is not a JSON object.
    #[error("request must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// The object lacks a string `method` field.
    #[error("request has no string `method` field")]
    MissingMethod,

    /// The object lacks an integer `seqNum` field.
    #[error("request `{method}` has no integer `seqNum` field")]
    InvalidSeqNum { method: String },

    /// The buffered bytes exceed the configured limit without forming a message.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge { size: usize, max_size: usize },
}

impl FrameError {
    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedJson {
            message: source.to_string(),
            source,
        }
    }

    /// Creates an error for a non-object document.
    pub fn not_an_object(value: &serde_json::Value) -> Self {
        let found = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a boolean",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Array(_) => "an array",
            serde_json::Value::Object(_) => "an object",
        };
        Self::NotAnObject { found }
    }

    /// Creates an invalid sequence number error.
    pub fn invalid_seq_num(method: impl Into<String>) -> Self {
        Self::InvalidSeqNum {
            method: method.into(),
        }
    }

    /// Creates a request too large error.
    pub fn too_large(size: usize, max_size: usize) -> Self {
        Self::TooLarge { size, max_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_oversized_buffers() {
        let error = FrameError::too_large(2048, 1024);
        assert_eq!(
            error.to_string(),
            "request too large: 2048 bytes exceeds 1024 byte limit"
        );
    }

    #[test]
    fn names_the_offending_json_kind() {
        let error = FrameError::not_an_object(&serde_json::json!([1, 2]));
        assert!(error.to_string().contains("an array"));
    }

    #[test]
    fn keeps_serde_source() {
        let source = serde_json::from_str::<serde_json::Value>("{,}").expect_err("invalid");
        let error = FrameError::from_json_error(source);
        assert!(std::error::Error::source(&error).is_some());
    }
}
