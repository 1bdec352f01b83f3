//! Response construction and reply encoding.
//!
//! A [`Response`] is built fresh for each structured request and always
//! echoes the request's `seqNum`. The dispatcher hands the I/O loop a
//! [`Reply`], which is either the `pong` literal or an encoded response.

use serde::Serialize;
use serde_json::{Map, Value};

/// Literal written back for a `ping`.
pub const PONG: &[u8] = b"pong";

/// Structured answer to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    success: bool,
    #[serde(rename = "seqNum")]
    seq_num: i64,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Response {
    /// Creates a successful response for the given sequence number.
    pub fn success(seq_num: i64) -> Self {
        Self {
            success: true,
            seq_num,
            fields: Map::new(),
        }
    }

    /// Creates a failed response for the given sequence number.
    pub fn failure(seq_num: i64) -> Self {
        Self {
            success: false,
            seq_num,
            fields: Map::new(),
        }
    }

    /// Adds a handler-specific field. `success` and `seqNum` are reserved and
    /// ignored here.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "success" && key != "seqNum" {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Echoed sequence number.
    pub fn seq_num(&self) -> i64 {
        self.seq_num
    }

    /// Looks up a handler-specific field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the response as a JSON value.
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("success".to_owned(), Value::Bool(self.success));
        object.insert("seqNum".to_owned(), Value::from(self.seq_num));
        Value::Object(object)
    }
}

/// Payload the I/O loop writes after a `NextWrite` action.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The `pong` literal.
    Pong,
    /// Encoded structured response.
    Message(Response),
}

impl Reply {
    /// Encodes the reply for the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be serialized.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Pong => Ok(PONG.to_vec()),
            Self::Message(response) => serde_json::to_vec(response),
        }
    }

    /// Returns the structured response, if this is not a `pong`.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Pong => None,
            Self::Message(response) => Some(response),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Message(response)
    }
}
