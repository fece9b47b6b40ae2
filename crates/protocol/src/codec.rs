//! Checked decoding of positional message arrays.
//!
//! This is the single chokepoint between untyped peer data and [`Message`]:
//! the arity and the type of every field are validated and any mismatch is
//! reported as a [`DecodeError`].

use thiserror::Error;

use crate::kind::MessageKind;
use crate::message::Message;
use crate::value::{Dict, Id, List, MAX_ID, Value};

/// Why an inbound payload could not be turned into a [`Message`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
	#[error("empty message")]
	Empty,

	#[error("message discriminant is not an unsigned integer: {0}")]
	InvalidKind(Value),

	#[error("unknown message discriminant {0}")]
	UnknownKind(u64),

	#[error("{kind} expects {min}..={max} fields, found {found}")]
	Arity {
		kind: MessageKind,
		min: usize,
		max: usize,
		found: usize,
	},

	#[error("{kind} field `{field}` must be {expected}")]
	FieldType {
		kind: MessageKind,
		field: &'static str,
		expected: &'static str,
	},
}

/// Decodes an array whose first element is the discriminant.
pub(crate) fn decode_array(array: List) -> Result<Message, DecodeError> {
	let mut fields = array.into_iter();
	let code = match fields.next() {
		None => return Err(DecodeError::Empty),
		Some(value) => value.as_u64().ok_or(DecodeError::InvalidKind(value))?,
	};
	decode(code, fields.collect())
}

/// Decodes a message from its discriminant and the remaining fields.
pub fn decode(code: u64, payload: List) -> Result<Message, DecodeError> {
	let kind = MessageKind::from_code(code).ok_or(DecodeError::UnknownKind(code))?;
	let (min, max) = arity(kind);
	if payload.len() < min || payload.len() > max {
		return Err(DecodeError::Arity {
			kind,
			min,
			max,
			found: payload.len(),
		});
	}

	let mut r = FieldReader::new(kind, payload);
	let message = match kind {
		MessageKind::Hello => Message::Hello {
			realm: r.string("realm")?,
			details: r.dict("details")?,
		},
		MessageKind::Welcome => Message::Welcome {
			session: r.id("session")?,
			details: r.dict("details")?,
		},
		MessageKind::Abort => Message::Abort {
			details: r.dict("details")?,
			reason: r.string("reason")?,
		},
		MessageKind::Challenge => Message::Challenge {
			auth_method: r.string("auth_method")?,
			extra: r.dict("extra")?,
		},
		MessageKind::Authenticate => Message::Authenticate {
			signature: r.string("signature")?,
			extra: r.dict("extra")?,
		},
		MessageKind::Goodbye => Message::Goodbye {
			details: r.dict("details")?,
			reason: r.string("reason")?,
		},
		MessageKind::Error => Message::Error {
			request_type: r.integer("request_type")?,
			request: r.id("request")?,
			details: r.dict("details")?,
			error: r.string("error")?,
			args: r.optional_list("args")?,
			kwargs: r.optional_dict("kwargs")?,
		},
		MessageKind::Publish => Message::Publish {
			request: r.id("request")?,
			options: r.dict("options")?,
			topic: r.string("topic")?,
			args: r.optional_list("args")?,
			kwargs: r.optional_dict("kwargs")?,
		},
		MessageKind::Published => Message::Published {
			request: r.id("request")?,
			publication: r.id("publication")?,
		},
		MessageKind::Subscribe => Message::Subscribe {
			request: r.id("request")?,
			options: r.dict("options")?,
			topic: r.string("topic")?,
		},
		MessageKind::Subscribed => Message::Subscribed {
			request: r.id("request")?,
			subscription: r.id("subscription")?,
		},
		MessageKind::Unsubscribe => Message::Unsubscribe {
			request: r.id("request")?,
			subscription: r.id("subscription")?,
		},
		MessageKind::Unsubscribed => Message::Unsubscribed { request: r.id("request")? },
		MessageKind::Event => Message::Event {
			subscription: r.id("subscription")?,
			publication: r.id("publication")?,
			details: r.dict("details")?,
			args: r.optional_list("args")?,
			kwargs: r.optional_dict("kwargs")?,
		},
		MessageKind::Call => Message::Call {
			request: r.id("request")?,
			options: r.dict("options")?,
			procedure: r.string("procedure")?,
			args: r.optional_list("args")?,
			kwargs: r.optional_dict("kwargs")?,
		},
		MessageKind::Result => Message::Result {
			request: r.id("request")?,
			details: r.dict("details")?,
			args: r.optional_list("args")?,
			kwargs: r.optional_dict("kwargs")?,
		},
		MessageKind::Register => Message::Register {
			request: r.id("request")?,
			options: r.dict("options")?,
			procedure: r.string("procedure")?,
		},
		MessageKind::Registered => Message::Registered {
			request: r.id("request")?,
			registration: r.id("registration")?,
		},
		MessageKind::Unregister => Message::Unregister {
			request: r.id("request")?,
			registration: r.id("registration")?,
		},
		MessageKind::Unregistered => Message::Unregistered { request: r.id("request")? },
		MessageKind::Invocation => Message::Invocation {
			request: r.id("request")?,
			registration: r.id("registration")?,
			details: r.dict("details")?,
			args: r.optional_list("args")?,
			kwargs: r.optional_dict("kwargs")?,
		},
		MessageKind::Yield => Message::Yield {
			request: r.id("request")?,
			options: r.dict("options")?,
			args: r.optional_list("args")?,
			kwargs: r.optional_dict("kwargs")?,
		},
	};
	Ok(message)
}

/// Field count after the discriminant, as `(required, required + optional)`.
fn arity(kind: MessageKind) -> (usize, usize) {
	match kind {
		MessageKind::Hello
		| MessageKind::Welcome
		| MessageKind::Abort
		| MessageKind::Challenge
		| MessageKind::Authenticate
		| MessageKind::Goodbye
		| MessageKind::Published
		| MessageKind::Subscribed
		| MessageKind::Unsubscribe
		| MessageKind::Registered
		| MessageKind::Unregister => (2, 2),
		MessageKind::Unsubscribed | MessageKind::Unregistered => (1, 1),
		MessageKind::Subscribe | MessageKind::Register => (3, 3),
		MessageKind::Error => (4, 6),
		MessageKind::Publish | MessageKind::Event | MessageKind::Call | MessageKind::Invocation => (3, 5),
		MessageKind::Result | MessageKind::Yield => (2, 4),
	}
}

struct FieldReader {
	kind: MessageKind,
	fields: std::vec::IntoIter<Value>,
}

impl FieldReader {
	fn new(kind: MessageKind, payload: List) -> Self {
		Self {
			kind,
			fields: payload.into_iter(),
		}
	}

	fn mismatch(&self, field: &'static str, expected: &'static str) -> DecodeError {
		DecodeError::FieldType {
			kind: self.kind,
			field,
			expected,
		}
	}

	fn next(&mut self, field: &'static str, expected: &'static str) -> Result<Value, DecodeError> {
		self.fields.next().ok_or_else(|| self.mismatch(field, expected))
	}

	fn integer(&mut self, field: &'static str) -> Result<u64, DecodeError> {
		self.next(field, "an unsigned integer")?
			.as_u64()
			.ok_or_else(|| self.mismatch(field, "an unsigned integer"))
	}

	fn id(&mut self, field: &'static str) -> Result<Id, DecodeError> {
		let value = self.next(field, "an id")?;
		match value.as_u64() {
			Some(id) if id <= MAX_ID => Ok(id),
			_ => Err(self.mismatch(field, "an id in 0..=2^53")),
		}
	}

	fn string(&mut self, field: &'static str) -> Result<String, DecodeError> {
		match self.next(field, "a string")? {
			Value::String(s) => Ok(s),
			_ => Err(self.mismatch(field, "a string")),
		}
	}

	fn dict(&mut self, field: &'static str) -> Result<Dict, DecodeError> {
		match self.next(field, "a dictionary")? {
			Value::Object(map) => Ok(map),
			_ => Err(self.mismatch(field, "a dictionary")),
		}
	}

	fn optional_list(&mut self, field: &'static str) -> Result<List, DecodeError> {
		match self.fields.next() {
			None => Ok(List::new()),
			Some(Value::Array(list)) => Ok(list),
			Some(_) => Err(self.mismatch(field, "a list")),
		}
	}

	fn optional_dict(&mut self, field: &'static str) -> Result<Dict, DecodeError> {
		match self.fields.next() {
			None => Ok(Dict::new()),
			Some(Value::Object(map)) => Ok(map),
			Some(_) => Err(self.mismatch(field, "a dictionary")),
		}
	}
}
