//! Error types for the session layer.

use std::fmt;

use thiserror::Error;
use wamp_protocol::{Dict, Id, List, SerializerError};
use wamp_runtime::TransportError;

use crate::session::SessionStatus;

pub type Result<T> = std::result::Result<T, Error>;

/// Which kind of live handle an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
	Subscription,
	Registration,
}

impl fmt::Display for HandleKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Subscription => f.write_str("subscription"),
			Self::Registration => f.write_str("registration"),
		}
	}
}

/// ERROR message returned by the router for one of our requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
	pub details: Dict,
	/// Error URI, e.g. `wamp.error.no_such_procedure`.
	pub error: String,
	pub args: List,
	pub kwargs: Dict,
}

impl fmt::Display for RemoteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.error)?;
		if let Some(first) = self.args.first() {
			match first.as_str() {
				Some(message) => write!(f, ": {message}")?,
				None => write!(f, ": {first}")?,
			}
		}
		Ok(())
	}
}

impl std::error::Error for RemoteError {}

#[derive(Debug, Error)]
pub enum Error {
	#[error("session is not established (status: {0})")]
	NotEstablished(SessionStatus),

	#[error("cannot {operation} while session is {status}")]
	InvalidState {
		operation: &'static str,
		status: SessionStatus,
	},

	#[error("{kind} {id} is already inactive")]
	HandleInactive { kind: HandleKind, id: Id },

	#[error("remote error: {0}")]
	Remote(RemoteError),

	#[error("session closed: {0}")]
	SessionClosed(String),

	#[error("transport error: {0}")]
	Transport(#[from] TransportError),

	#[error("serializer error: {0}")]
	Serializer(#[from] SerializerError),

	#[error("request {0} was discarded before a reply arrived")]
	RequestDiscarded(Id),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// The router's error reply, when this error is one.
	pub fn remote(&self) -> Option<&RemoteError> {
		match self {
			Self::Remote(remote) => Some(remote),
			_ => None,
		}
	}

	pub fn is_session_closed(&self) -> bool {
		matches!(self, Self::SessionClosed(_))
	}
}
