//! JSON codec for encoding and decoding Tileshare session messages.
//!
//! Wire format: one UTF-8 JSON object per transport payload, always carrying a
//! string `"type"` field.  See [`crate::protocol::messages`] for every shape.
//!
//! # Decoding in two steps
//!
//! Decoding first parses the bytes into a generic JSON value and reads the
//! `"type"` tag.  Only then is the value converted into a [`SyncMessage`].
//! That split lets the decoder tell three situations apart:
//!
//! - a known tag with a valid payload → [`Envelope::Sync`]
//! - a tag this build does not know → [`Envelope::Unrecognized`] (not an error;
//!   the session ignores it)
//! - garbage, a missing tag, or a known tag with a broken payload →
//!   [`ProtocolError`]

use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{MessageKind, SyncMessage};

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The payload is not valid UTF-8 JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// The JSON value is not an object with a string `"type"` field.
    #[error("message has no string \"type\" field")]
    MissingType,

    /// The tag is known but the remaining fields do not match its shape.
    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: &'static str, reason: String },

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

/// The result of decoding one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A message this build understands.
    Sync(SyncMessage),
    /// A well-formed message whose `"type"` this build does not know.
    Unrecognized { kind: String },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`SyncMessage`] into its JSON wire representation.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use tileshare_core::protocol::{decode_message, encode_message, Envelope, SyncMessage};
///
/// let bytes = encode_message(&SyncMessage::IAmHost).unwrap();
/// assert_eq!(bytes, br#"{"type":"iAmHost"}"#);
/// assert_eq!(decode_message(&bytes).unwrap(), Envelope::Sync(SyncMessage::IAmHost));
/// ```
pub fn encode_message(msg: &SyncMessage) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(msg).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decodes one inbound payload.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are not JSON, carry no `"type"`, or
/// carry a known `"type"` with a payload of the wrong shape.
///
/// # Examples
///
/// ```rust
/// use tileshare_core::protocol::{decode_message, Envelope};
///
/// let envelope = decode_message(br#"{"type":"wave","hand":"left"}"#).unwrap();
/// assert_eq!(envelope, Envelope::Unrecognized { kind: "wave".to_string() });
/// ```
pub fn decode_message(bytes: &[u8]) -> Result<Envelope, ProtocolError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;

    let kind = match value.get("type").and_then(Value::as_str) {
        None => return Err(ProtocolError::MissingType),
        Some(tag) => match MessageKind::from_wire_tag(tag) {
            Some(kind) => kind,
            None => {
                tracing::trace!("unrecognized message type {tag:?}");
                return Ok(Envelope::Unrecognized {
                    kind: tag.to_string(),
                })
            }
        },
    };

    serde_json::from_value(value)
        .map(Envelope::Sync)
        .map_err(|e| ProtocolError::MalformedPayload {
            kind: kind.wire_tag(),
            reason: e.to_string(),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
