//! Outstanding requests awaiting a correlated response.
//!
//! One table per initiator role. Keys are request ids allocated by the
//! session's single counter, so a key is never legitimately inserted twice.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tokio::sync::oneshot;
use tracing::error;
use wamp_protocol::Id;

use crate::error::{Error, Result};
use crate::registration::{InvocationHandler, Registration};
use crate::subscription::{EventHandler, Subscription};
use crate::types::CallResult;

/// Completion side of a request: resolved once with success or failure.
pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// Anything stored in a pending table can be failed wholesale.
pub(crate) trait Continuation {
	fn reject(self, error: Error);
}

impl<T> Continuation for Reply<T> {
	fn reject(self, error: Error) {
		// The caller may have stopped waiting.
		let _ = self.send(Err(error));
	}
}

/// A request nobody waits on.
impl<C: Continuation> Continuation for Option<C> {
	fn reject(self, error: Error) {
		if let Some(continuation) = self {
			continuation.reject(error);
		}
	}
}

pub(crate) struct PendingCall {
	pub reply: Reply<CallResult>,
}

pub(crate) struct PendingSubscribe {
	pub topic: String,
	pub handler: EventHandler,
	pub reply: Reply<Subscription>,
}

/// `reply` is `None` when the session releases a subscription on its own.
pub(crate) struct PendingUnsubscribe {
	pub subscription: Id,
	pub reply: Option<Reply<()>>,
}

pub(crate) struct PendingPublish {
	pub reply: Reply<()>,
}

pub(crate) struct PendingRegister {
	pub procedure: String,
	pub handler: InvocationHandler,
	pub reply: Reply<Registration>,
}

pub(crate) struct PendingUnregister {
	pub registration: Id,
	pub reply: Option<Reply<()>>,
}

macro_rules! reject_via_reply {
	($($ty:ty),* $(,)?) => {
		$(
			impl Continuation for $ty {
				fn reject(self, error: Error) {
					self.reply.reject(error);
				}
			}
		)*
	};
}

reject_via_reply!(
	PendingCall,
	PendingSubscribe,
	PendingUnsubscribe,
	PendingPublish,
	PendingRegister,
	PendingUnregister,
);

/// Request id → continuation bundle for one role.
pub(crate) struct PendingTable<T> {
	name: &'static str,
	entries: HashMap<Id, T>,
}

impl<T> PendingTable<T> {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			entries: HashMap::new(),
		}
	}

	/// Records a new outstanding request. A colliding id is a logic bug: it
	/// trips a debug assertion, and release builds keep the existing entry.
	pub fn insert(&mut self, id: Id, entry: T) {
		match self.entries.entry(id) {
			Entry::Vacant(slot) => {
				slot.insert(entry);
			}
			Entry::Occupied(_) => {
				debug_assert!(false, "request id {id} already pending in {} table", self.name);
				error!(target = "wamp.session", table = self.name, request = id, "request id collision; new request dropped");
			}
		}
	}

	/// Removes and returns the entry for `id`.
	pub fn take(&mut self, id: Id) -> Option<T> {
		self.entries.remove(&id)
	}

	pub fn contains(&self, id: Id) -> bool {
		self.entries.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn drain(&mut self) -> impl Iterator<Item = (Id, T)> + '_ {
		self.entries.drain()
	}
}

impl<T: Continuation> PendingTable<T> {
	/// Fails every outstanding request with an error built by `error`.
	pub fn reject_all(&mut self, mut error: impl FnMut() -> Error) -> usize {
		let mut rejected = 0;
		for (_, entry) in self.drain() {
			entry.reject(error());
			rejected += 1;
		}
		rejected
	}
}
