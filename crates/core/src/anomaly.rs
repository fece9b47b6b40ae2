//! Inconsistencies reported by the peer's traffic that do not end the session.

use thiserror::Error;
use wamp_protocol::{DecodeError, Id, MessageKind, SerializerError};

use crate::error::HandleKind;
use crate::session::SessionStatus;

/// Something the router sent that the session could not make sense of.
///
/// The offending message is dropped, the anomaly is logged at `warn` and
/// handed to [`SessionDelegate::anomaly`](crate::SessionDelegate::anomaly).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Anomaly {
	#[error("{kind} for unknown request {request_id}")]
	UnknownRequest { kind: MessageKind, request_id: Id },

	#[error("EVENT for unknown subscription {0}")]
	UnknownSubscription(Id),

	#[error("INVOCATION for unknown registration {0}")]
	UnknownRegistration(Id),

	#[error("ERROR for request {request_id} of unrecognised type {request_type}")]
	UnknownErrorKind { request_type: u64, request_id: Id },

	/// UNSUBSCRIBED or UNREGISTERED for a handle that was already gone.
	#[error("{kind} {id} was no longer registered")]
	HandleGone { kind: HandleKind, id: Id },

	#[error("malformed message: {0}")]
	Malformed(DecodeError),

	#[error("undecodable payload: {0}")]
	Unpack(SerializerError),

	#[error("unexpected {kind} while session is {status}")]
	UnexpectedMessage { kind: MessageKind, status: SessionStatus },
}
