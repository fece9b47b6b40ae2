//! Handle for an active topic subscription.

use std::fmt;
use std::sync::{Arc, Weak};

use wamp_protocol::Id;

use crate::error::{HandleKind, Result};
use crate::handle::HandleCore;
use crate::session::SessionInner;
use crate::types::Event;

/// Callback receiving events for one subscription.
pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// A live subscription. Clones share the same underlying handle.
///
/// The handle stays active until it is cancelled or the session loses its
/// transport. It does not keep the session alive.
#[derive(Clone)]
pub struct Subscription {
	inner: Arc<HandleCore<EventHandler>>,
}

impl Subscription {
	pub(crate) fn new(id: Id, topic: String, session: Weak<SessionInner>, handler: EventHandler) -> Self {
		Self {
			inner: Arc::new(HandleCore::new(HandleKind::Subscription, id, topic, session, handler)),
		}
	}

	/// Router-assigned subscription id.
	pub fn id(&self) -> Id {
		self.inner.id()
	}

	pub fn topic(&self) -> &str {
		self.inner.uri()
	}

	pub fn is_active(&self) -> bool {
		self.inner.is_active()
	}

	/// Replaces the handler. Events dispatched after this returns go to `handler`.
	pub fn rebind<F>(&self, handler: F)
	where
		F: Fn(Event) + Send + Sync + 'static,
	{
		self.inner.set_handler(Arc::new(handler));
	}

	/// Unsubscribes and waits for the router to confirm.
	pub async fn cancel(&self) -> Result<()> {
		self.inner.cancellable()?.unsubscribe(self.id()).await
	}

	pub(crate) fn handler(&self) -> EventHandler {
		self.inner.handler()
	}

	pub(crate) fn invalidate(&self) {
		self.inner.invalidate();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id())
			.field("topic", &self.topic())
			.field("active", &self.is_active())
			.finish()
	}
}
