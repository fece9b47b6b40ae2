//! WAMP message taxonomy.
//!
//! Each variant mirrors one wire message. Field order in [`Message::to_array`]
//! is the order mandated by the protocol:
//!
//! ```text
//! [CALL, Request|id, Options|dict, Procedure|uri, Arguments|list, ArgumentsKw|dict]
//! ```
//!
//! Trailing `args`/`kwargs` are optional on the wire. In memory they are
//! always present and empty means absent, so encoding then decoding gives
//! back the same value.

use serde_json::json;

use crate::kind::MessageKind;
use crate::value::{Dict, Id, List, Value};

/// A single WAMP message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
	Hello {
		realm: String,
		details: Dict,
	},
	Welcome {
		session: Id,
		details: Dict,
	},
	Abort {
		details: Dict,
		reason: String,
	},
	Challenge {
		auth_method: String,
		extra: Dict,
	},
	Authenticate {
		signature: String,
		extra: Dict,
	},
	Goodbye {
		details: Dict,
		reason: String,
	},
	/// Generic error reply; `request_type` is the discriminant of the request
	/// it answers and is kept raw so unknown kinds can be reported.
	Error {
		request_type: u64,
		request: Id,
		details: Dict,
		error: String,
		args: List,
		kwargs: Dict,
	},
	Publish {
		request: Id,
		options: Dict,
		topic: String,
		args: List,
		kwargs: Dict,
	},
	Published {
		request: Id,
		publication: Id,
	},
	Subscribe {
		request: Id,
		options: Dict,
		topic: String,
	},
	Subscribed {
		request: Id,
		subscription: Id,
	},
	Unsubscribe {
		request: Id,
		subscription: Id,
	},
	Unsubscribed {
		request: Id,
	},
	Event {
		subscription: Id,
		publication: Id,
		details: Dict,
		args: List,
		kwargs: Dict,
	},
	Call {
		request: Id,
		options: Dict,
		procedure: String,
		args: List,
		kwargs: Dict,
	},
	Result {
		request: Id,
		details: Dict,
		args: List,
		kwargs: Dict,
	},
	Register {
		request: Id,
		options: Dict,
		procedure: String,
	},
	Registered {
		request: Id,
		registration: Id,
	},
	Unregister {
		request: Id,
		registration: Id,
	},
	Unregistered {
		request: Id,
	},
	Invocation {
		request: Id,
		registration: Id,
		details: Dict,
		args: List,
		kwargs: Dict,
	},
	Yield {
		request: Id,
		options: Dict,
		args: List,
		kwargs: Dict,
	},
}

impl Message {
	pub fn kind(&self) -> MessageKind {
		match self {
			Self::Hello { .. } => MessageKind::Hello,
			Self::Welcome { .. } => MessageKind::Welcome,
			Self::Abort { .. } => MessageKind::Abort,
			Self::Challenge { .. } => MessageKind::Challenge,
			Self::Authenticate { .. } => MessageKind::Authenticate,
			Self::Goodbye { .. } => MessageKind::Goodbye,
			Self::Error { .. } => MessageKind::Error,
			Self::Publish { .. } => MessageKind::Publish,
			Self::Published { .. } => MessageKind::Published,
			Self::Subscribe { .. } => MessageKind::Subscribe,
			Self::Subscribed { .. } => MessageKind::Subscribed,
			Self::Unsubscribe { .. } => MessageKind::Unsubscribe,
			Self::Unsubscribed { .. } => MessageKind::Unsubscribed,
			Self::Event { .. } => MessageKind::Event,
			Self::Call { .. } => MessageKind::Call,
			Self::Result { .. } => MessageKind::Result,
			Self::Register { .. } => MessageKind::Register,
			Self::Registered { .. } => MessageKind::Registered,
			Self::Unregister { .. } => MessageKind::Unregister,
			Self::Unregistered { .. } => MessageKind::Unregistered,
			Self::Invocation { .. } => MessageKind::Invocation,
			Self::Yield { .. } => MessageKind::Yield,
		}
	}

	/// Request id carried by request/response messages, if any.
	pub fn request_id(&self) -> Option<Id> {
		match self {
			Self::Error { request, .. }
			| Self::Publish { request, .. }
			| Self::Published { request, .. }
			| Self::Subscribe { request, .. }
			| Self::Subscribed { request, .. }
			| Self::Unsubscribe { request, .. }
			| Self::Unsubscribed { request }
			| Self::Call { request, .. }
			| Self::Result { request, .. }
			| Self::Register { request, .. }
			| Self::Registered { request, .. }
			| Self::Unregister { request, .. }
			| Self::Unregistered { request }
			| Self::Invocation { request, .. }
			| Self::Yield { request, .. } => Some(*request),
			Self::Hello { .. }
			| Self::Welcome { .. }
			| Self::Abort { .. }
			| Self::Challenge { .. }
			| Self::Authenticate { .. }
			| Self::Goodbye { .. }
			| Self::Event { .. } => None,
		}
	}

	/// Encodes the message as the positional array handed to a serializer,
	/// discriminant first.
	pub fn to_array(&self) -> List {
		let mut out = vec![json!(self.kind().code())];
		match self {
			Self::Hello { realm, details } => {
				out.push(json!(realm));
				out.push(Value::Object(details.clone()));
			}
			Self::Welcome { session, details } => {
				out.push(json!(session));
				out.push(Value::Object(details.clone()));
			}
			Self::Abort { details, reason } | Self::Goodbye { details, reason } => {
				out.push(Value::Object(details.clone()));
				out.push(json!(reason));
			}
			Self::Challenge { auth_method, extra } => {
				out.push(json!(auth_method));
				out.push(Value::Object(extra.clone()));
			}
			Self::Authenticate { signature, extra } => {
				out.push(json!(signature));
				out.push(Value::Object(extra.clone()));
			}
			Self::Error {
				request_type,
				request,
				details,
				error,
				args,
				kwargs,
			} => {
				out.push(json!(request_type));
				out.push(json!(request));
				out.push(Value::Object(details.clone()));
				out.push(json!(error));
				push_arguments(&mut out, args, kwargs);
			}
			Self::Publish {
				request,
				options,
				topic,
				args,
				kwargs,
			} => {
				out.push(json!(request));
				out.push(Value::Object(options.clone()));
				out.push(json!(topic));
				push_arguments(&mut out, args, kwargs);
			}
			Self::Published { request, publication } => {
				out.push(json!(request));
				out.push(json!(publication));
			}
			Self::Subscribe { request, options, topic } => {
				out.push(json!(request));
				out.push(Value::Object(options.clone()));
				out.push(json!(topic));
			}
			Self::Subscribed { request, subscription } | Self::Unsubscribe { request, subscription } => {
				out.push(json!(request));
				out.push(json!(subscription));
			}
			Self::Unsubscribed { request } | Self::Unregistered { request } => {
				out.push(json!(request));
			}
			Self::Event {
				subscription,
				publication,
				details,
				args,
				kwargs,
			} => {
				out.push(json!(subscription));
				out.push(json!(publication));
				out.push(Value::Object(details.clone()));
				push_arguments(&mut out, args, kwargs);
			}
			Self::Call {
				request,
				options,
				procedure,
				args,
				kwargs,
			} => {
				out.push(json!(request));
				out.push(Value::Object(options.clone()));
				out.push(json!(procedure));
				push_arguments(&mut out, args, kwargs);
			}
			Self::Result {
				request,
				details,
				args,
				kwargs,
			} => {
				out.push(json!(request));
				out.push(Value::Object(details.clone()));
				push_arguments(&mut out, args, kwargs);
			}
			Self::Register {
				request,
				options,
				procedure,
			} => {
				out.push(json!(request));
				out.push(Value::Object(options.clone()));
				out.push(json!(procedure));
			}
			Self::Registered { request, registration } | Self::Unregister { request, registration } => {
				out.push(json!(request));
				out.push(json!(registration));
			}
			Self::Invocation {
				request,
				registration,
				details,
				args,
				kwargs,
			} => {
				out.push(json!(request));
				out.push(json!(registration));
				out.push(Value::Object(details.clone()));
				push_arguments(&mut out, args, kwargs);
			}
			Self::Yield {
				request,
				options,
				args,
				kwargs,
			} => {
				out.push(json!(request));
				out.push(Value::Object(options.clone()));
				push_arguments(&mut out, args, kwargs);
			}
		}
		out
	}

	/// Decodes a positional array whose first element is the discriminant.
	pub fn from_array(array: List) -> Result<Self, crate::DecodeError> {
		crate::codec::decode_array(array)
	}
}

// `kwargs` requires `args` to be present, even if empty.
fn push_arguments(out: &mut List, args: &List, kwargs: &Dict) {
	if args.is_empty() && kwargs.is_empty() {
		return;
	}
	out.push(Value::Array(args.clone()));
	if !kwargs.is_empty() {
		out.push(Value::Object(kwargs.clone()));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn call_encodes_in_protocol_order() {
		let message = Message::Call {
			request: 7,
			options: Dict::new(),
			procedure: "org.test.add".to_string(),
			args: vec![json!(1), json!(1)],
			kwargs: Dict::new(),
		};

		assert_eq!(message.to_array(), vec![json!(48), json!(7), json!({}), json!("org.test.add"), json!([1, 1])]);
	}

	#[test]
	fn empty_arguments_are_omitted() {
		let message = Message::Result {
			request: 3,
			details: Dict::new(),
			args: List::new(),
			kwargs: Dict::new(),
		};

		assert_eq!(message.to_array(), vec![json!(50), json!(3), json!({})]);
	}

	#[test]
	fn kwargs_force_an_empty_args_list() {
		let mut kwargs = Dict::new();
		kwargs.insert("name".to_string(), json!("value"));
		let message = Message::Yield {
			request: 1,
			options: Dict::new(),
			args: List::new(),
			kwargs,
		};

		assert_eq!(message.to_array(), vec![json!(70), json!(1), json!({}), json!([]), json!({"name": "value"})]);
	}

	#[test]
	fn request_id_is_exposed_for_correlated_messages() {
		assert_eq!(Message::Unsubscribed { request: 12 }.request_id(), Some(12));
		assert_eq!(
			Message::Goodbye {
				details: Dict::new(),
				reason: "wamp.close.close_realm".to_string(),
			}
			.request_id(),
			None
		);
	}
}
