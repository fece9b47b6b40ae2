//! State shared by [`Subscription`](crate::Subscription) and
//! [`Registration`](crate::Registration) handles.

use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use wamp_protocol::Id;

use crate::error::{Error, HandleKind, Result};
use crate::session::{Session, SessionInner};

pub(crate) struct HandleCore<H> {
	kind: HandleKind,
	id: Id,
	/// Topic or procedure URI.
	uri: String,
	session: Weak<SessionInner>,
	handler: RwLock<H>,
	active: AtomicBool,
}

impl<H: Clone> HandleCore<H> {
	pub fn new(kind: HandleKind, id: Id, uri: String, session: Weak<SessionInner>, handler: H) -> Self {
		Self {
			kind,
			id,
			uri,
			session,
			handler: RwLock::new(handler),
			active: AtomicBool::new(true),
		}
	}

	pub fn id(&self) -> Id {
		self.id
	}

	pub fn uri(&self) -> &str {
		&self.uri
	}

	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	pub fn handler(&self) -> H {
		self.handler.read().clone()
	}

	pub fn set_handler(&self, handler: H) {
		*self.handler.write() = handler;
	}

	pub fn invalidate(&self) {
		self.active.store(false, Ordering::Release);
	}

	/// The owning session, if this handle can still be cancelled through it.
	pub fn cancellable(&self) -> Result<Session> {
		if !self.is_active() {
			return Err(Error::HandleInactive {
				kind: self.kind,
				id: self.id,
			});
		}
		self.session
			.upgrade()
			.map(Session::from_inner)
			.ok_or_else(|| Error::SessionClosed("session dropped".to_string()))
	}
}
