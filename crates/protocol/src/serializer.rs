//! Serializer contract between the codec and the transport.
//!
//! A serializer turns the positional array produced by
//! [`Message::to_array`](crate::Message::to_array) into a transport payload
//! and back. It knows nothing about message semantics.

use thiserror::Error;

use crate::value::{List, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializerError {
	#[error("failed to pack message: {0}")]
	Pack(String),

	#[error("failed to unpack payload: {0}")]
	Unpack(String),

	#[error("payload is not a message array")]
	NotAnArray,
}

/// Reversible encoding of a message array.
pub trait Serializer: Send + Sync {
	/// WebSocket subprotocol that negotiates this serializer.
	fn subprotocol(&self) -> &'static str;

	/// `true` when packed payloads are UTF-8 text.
	fn is_text(&self) -> bool;

	fn pack(&self, message: &[Value]) -> Result<Vec<u8>, SerializerError>;

	fn unpack(&self, payload: &[u8]) -> Result<List, SerializerError>;
}

/// `wamp.2.json`: each message is a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
	fn subprotocol(&self) -> &'static str {
		"wamp.2.json"
	}

	fn is_text(&self) -> bool {
		true
	}

	fn pack(&self, message: &[Value]) -> Result<Vec<u8>, SerializerError> {
		serde_json::to_vec(message).map_err(|e| SerializerError::Pack(e.to_string()))
	}

	fn unpack(&self, payload: &[u8]) -> Result<List, SerializerError> {
		match serde_json::from_slice::<Value>(payload) {
			Ok(Value::Array(items)) => Ok(items),
			Ok(_) => Err(SerializerError::NotAnArray),
			Err(e) => Err(SerializerError::Unpack(e.to_string())),
		}
	}
}
