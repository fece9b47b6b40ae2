//! Handle for a procedure registered with the router.

use std::fmt;
use std::sync::{Arc, Weak};

use wamp_protocol::Id;

use crate::error::{HandleKind, Result};
use crate::handle::HandleCore;
use crate::session::SessionInner;
use crate::types::{Invocation, InvocationError, Yield};

/// Callback answering invocations of one registered procedure.
pub type InvocationHandler = Arc<dyn Fn(Invocation) -> std::result::Result<Yield, InvocationError> + Send + Sync>;

/// A live registration. Clones share the same underlying handle.
#[derive(Clone)]
pub struct Registration {
	inner: Arc<HandleCore<InvocationHandler>>,
}

impl Registration {
	pub(crate) fn new(id: Id, procedure: String, session: Weak<SessionInner>, handler: InvocationHandler) -> Self {
		Self {
			inner: Arc::new(HandleCore::new(HandleKind::Registration, id, procedure, session, handler)),
		}
	}

	pub fn id(&self) -> Id {
		self.inner.id()
	}

	pub fn procedure(&self) -> &str {
		self.inner.uri()
	}

	pub fn is_active(&self) -> bool {
		self.inner.is_active()
	}

	pub fn rebind<F>(&self, handler: F)
	where
		F: Fn(Invocation) -> std::result::Result<Yield, InvocationError> + Send + Sync + 'static,
	{
		self.inner.set_handler(Arc::new(handler));
	}

	/// Unregisters the procedure and waits for the router to confirm.
	pub async fn cancel(&self) -> Result<()> {
		self.inner.cancellable()?.unregister(self.id()).await
	}

	pub(crate) fn handler(&self) -> InvocationHandler {
		self.inner.handler()
	}

	pub(crate) fn invalidate(&self) {
		self.inner.invalidate();
	}
}

impl fmt::Debug for Registration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registration")
			.field("id", &self.id())
			.field("procedure", &self.procedure())
			.field("active", &self.is_active())
			.finish()
	}
}
