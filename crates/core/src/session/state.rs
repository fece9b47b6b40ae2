//! Mutable session state guarded by the session lock.

use std::fmt;
use std::sync::Arc;

use wamp_protocol::{Dict, Id, MAX_ID, Message, Role, Serializer, Value};
use wamp_runtime::TransportError;

use crate::error::{Error, Result};
use crate::pending::{
	PendingCall, PendingPublish, PendingRegister, PendingSubscribe, PendingTable, PendingUnregister, PendingUnsubscribe,
};
use crate::registration::Registration;
use crate::registry::HandleRegistry;
use crate::subscription::Subscription;

/// Lifecycle of a session.
///
/// `Idle → Connecting → Established → Closing → Closed`, and back to
/// `Connecting` on reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
	Idle,
	Connecting,
	Established,
	Closing,
	Closed,
}

impl SessionStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Connecting => "connecting",
			Self::Established => "established",
			Self::Closing => "closing",
			Self::Closed => "closed",
		}
	}

	/// Whether replies to our requests can still arrive.
	pub(crate) fn accepts_replies(self) -> bool {
		matches!(self, Self::Established | Self::Closing)
	}
}

impl fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

pub(crate) struct SessionState {
	pub status: SessionStatus,
	pub session_id: Option<Id>,
	pub serializer: Option<Arc<dyn Serializer>>,
	pub router_roles: Vec<Role>,
	pub auto_reconnect: bool,
	/// Set when this side ended the session (disconnect, local abort) or the
	/// router aborted it; suppresses auto-reconnect.
	pub local_close: bool,
	last_request: Id,

	pub calls: PendingTable<PendingCall>,
	pub subscribes: PendingTable<PendingSubscribe>,
	pub unsubscribes: PendingTable<PendingUnsubscribe>,
	pub publishes: PendingTable<PendingPublish>,
	pub registers: PendingTable<PendingRegister>,
	pub unregisters: PendingTable<PendingUnregister>,

	pub subscriptions: HandleRegistry<Subscription>,
	pub registrations: HandleRegistry<Registration>,
}

impl SessionState {
	pub fn new() -> Self {
		Self {
			status: SessionStatus::Idle,
			session_id: None,
			serializer: None,
			router_roles: Vec::new(),
			auto_reconnect: false,
			local_close: false,
			last_request: 0,
			calls: PendingTable::new("call"),
			subscribes: PendingTable::new("subscribe"),
			unsubscribes: PendingTable::new("unsubscribe"),
			publishes: PendingTable::new("publish"),
			registers: PendingTable::new("register"),
			unregisters: PendingTable::new("unregister"),
			subscriptions: HandleRegistry::new(),
			registrations: HandleRegistry::new(),
		}
	}

	pub fn ensure_established(&self) -> Result<()> {
		match self.status {
			SessionStatus::Established => Ok(()),
			status => Err(Error::NotEstablished(status)),
		}
	}

	/// Next request id. Ids start at 1, wrap after 2^53 and never collide
	/// with a request that is still outstanding.
	pub fn next_request_id(&mut self) -> Id {
		loop {
			self.last_request = if self.last_request >= MAX_ID { 1 } else { self.last_request + 1 };
			if !self.is_outstanding(self.last_request) {
				return self.last_request;
			}
		}
	}

	pub fn is_outstanding(&self, id: Id) -> bool {
		self.calls.contains(id)
			|| self.subscribes.contains(id)
			|| self.unsubscribes.contains(id)
			|| self.publishes.contains(id)
			|| self.registers.contains(id)
			|| self.unregisters.contains(id)
	}

	pub fn outstanding(&self) -> usize {
		self.calls.len()
			+ self.subscribes.len()
			+ self.unsubscribes.len()
			+ self.publishes.len()
			+ self.registers.len()
			+ self.unregisters.len()
	}

	pub fn encode(&self, message: &Message) -> Result<Vec<u8>> {
		let serializer = self.serializer.as_ref().ok_or(TransportError::NotConnected)?;
		Ok(serializer.pack(&message.to_array())?)
	}

	/// Clears per-connection state after the transport went away: fails every
	/// outstanding request and deactivates every handle. Returns how many
	/// requests were failed.
	pub fn teardown(&mut self, reason: &str) -> usize {
		self.status = SessionStatus::Closed;
		self.session_id = None;
		self.serializer = None;
		self.router_roles.clear();

		let closed = || Error::SessionClosed(reason.to_string());
		let failed = self.calls.reject_all(closed)
			+ self.subscribes.reject_all(closed)
			+ self.unsubscribes.reject_all(closed)
			+ self.publishes.reject_all(closed)
			+ self.registers.reject_all(closed)
			+ self.unregisters.reject_all(closed);

		for subscription in self.subscriptions.drain() {
			subscription.invalidate();
		}
		for registration in self.registrations.drain() {
			registration.invalidate();
		}
		failed
	}
}

/// Roles the router announced in WELCOME details; unknown names are skipped.
pub(crate) fn router_roles(details: &Dict) -> Vec<Role> {
	details
		.get("roles")
		.and_then(Value::as_object)
		.map(|roles| roles.keys().filter_map(|name| name.parse().ok()).collect())
		.unwrap_or_default()
}
