//! Stream Reason Decoding
//!
//! The funding purpose attached to a stream is an opaque byte payload that
//! may be raw bytes, UTF-8 text, or a JSON document. Decoding is an ordered
//! attempt-and-fallback chain over an explicit tagged variant: each step
//! that fails falls back to the previous successful representation, and no
//! step ever raises.

use serde_json::Value;

/// The decoded funding purpose of a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamReason {
    /// No payload was attached.
    Empty,
    /// Payload is not valid UTF-8; raw bytes unchanged.
    Bytes(Vec<u8>),
    /// Payload is UTF-8 text but not JSON.
    Text(String),
    /// Payload parsed as a JSON document.
    Json(Value),
}

impl StreamReason {
    /// Decode a raw payload: bytes, then UTF-8, then JSON, keeping the last
    /// representation that succeeded.
    #[must_use]
    pub fn decode(raw: &[u8]) -> Self {
        if raw.is_empty() {
            return Self::Empty;
        }

        let Ok(text) = std::str::from_utf8(raw) else {
            return Self::Bytes(raw.to_vec());
        };

        match serde_json::from_str::<Value>(text) {
            // Bare JSON scalars ("5", "true") read better as text.
            Ok(value) if value.is_object() || value.is_array() => Self::Json(value),
            _ => Self::Text(text.to_string()),
        }
    }

    /// The text form, if the payload decoded that far.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The JSON form, if the payload parsed as a document.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Display for StreamReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::Text(text) => write!(f, "{text}"),
            Self::Json(value) => write!(f, "{value}"),
        }
    }
}
