//! Protocol module containing the message envelope and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_message, Envelope, ProtocolError};
pub use messages::*;
