//! Values handed to and returned from application code.

use thiserror::Error;
use wamp_protocol::uri;
use wamp_protocol::{Dict, Id, List, Value};

/// Successful outcome of [`Session::call`](crate::Session::call).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult {
	pub details: Dict,
	pub args: List,
	pub kwargs: Dict,
}

/// An EVENT delivered to a subscription handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	pub subscription: Id,
	pub publication: Id,
	pub topic: String,
	/// Router-supplied details; carries `"topic"` whenever the router sent any.
	pub details: Dict,
	pub args: List,
	pub kwargs: Dict,
}

/// An INVOCATION delivered to a registration handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
	pub request: Id,
	pub registration: Id,
	pub procedure: String,
	pub details: Dict,
	pub args: List,
	pub kwargs: Dict,
}

/// Successful reply to an invocation, sent as YIELD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Yield {
	pub options: Dict,
	pub args: List,
	pub kwargs: Dict,
}

impl Yield {
	pub fn new() -> Self {
		Self::default()
	}

	/// Yield carrying positional results.
	pub fn with_args(args: List) -> Self {
		Self {
			args,
			..Self::default()
		}
	}

	pub fn kwargs(mut self, kwargs: Dict) -> Self {
		self.kwargs = kwargs;
		self
	}

	pub fn options(mut self, options: Dict) -> Self {
		self.options = options;
		self
	}
}

/// Failed reply to an invocation, sent as ERROR.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct InvocationError {
	/// Error URI reported to the caller.
	pub error: String,
	pub details: Dict,
	pub args: List,
	pub kwargs: Dict,
}

impl InvocationError {
	pub fn new(error: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			details: Dict::new(),
			args: List::new(),
			kwargs: Dict::new(),
		}
	}

	/// `wamp.error.runtime_error` with a human readable message as first argument.
	pub fn runtime(message: impl Into<String>) -> Self {
		Self::new(uri::RUNTIME_ERROR).args(vec![Value::String(message.into())])
	}

	pub fn args(mut self, args: List) -> Self {
		self.args = args;
		self
	}

	pub fn kwargs(mut self, kwargs: Dict) -> Self {
		self.kwargs = kwargs;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn runtime_error_carries_message() {
		let err = InvocationError::runtime("division by zero");
		assert_eq!(err.error, "wamp.error.runtime_error");
		assert_eq!(err.args, vec![json!("division by zero")]);
		assert_eq!(err.to_string(), "wamp.error.runtime_error");
	}

	#[test]
	fn yield_builders_fill_fields() {
		let mut kwargs = Dict::new();
		kwargs.insert("total".to_string(), json!(3));
		let reply = Yield::with_args(vec![json!(3)]).kwargs(kwargs.clone());
		assert_eq!(reply.args, vec![json!(3)]);
		assert_eq!(reply.kwargs, kwargs);
		assert!(reply.options.is_empty());
	}
}
