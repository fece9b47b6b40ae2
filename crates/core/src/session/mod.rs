//! WAMP client session.
//!
//! A [`Session`] joins one realm over a [`Transport`] and multiplexes the
//! four client roles on top of it:
//!
//! * **caller**: [`Session::call`]
//! * **publisher**: [`Session::publish`], [`Session::publish_acknowledged`]
//! * **subscriber**: [`Session::subscribe`] → [`Subscription`]
//! * **callee**: [`Session::register`] → [`Registration`]
//!
//! Every request gets a fresh id and a pending entry; the router's reply is
//! correlated by that id and completes the returned future exactly once.
//!
//! Inbound traffic is processed by [`Session::run`], which must be driven on
//! a task of its own:
//!
//! ```ignore
//! let session = Session::new(SessionConfig::new("realm1"), Arc::new(WebSocketTransport::new(url)));
//! tokio::spawn({
//!     let session = session.clone();
//!     async move { session.run().await }
//! });
//! session.connect(false)?;
//! ```

mod dispatch;
mod state;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use wamp_protocol::{Dict, Id, List, Message, Role, uri};
use wamp_runtime::{EventSink, Transport, TransportEvent};

pub use state::SessionStatus;
pub(crate) use state::SessionState;

use crate::config::SessionConfig;
use crate::delegate::SessionDelegate;
use crate::error::{Error, HandleKind, Result};
use crate::pending::{
	PendingCall, PendingPublish, PendingRegister, PendingSubscribe, PendingUnregister, PendingUnsubscribe, Reply,
};
use crate::registration::Registration;
use crate::subscription::Subscription;
use crate::types::{CallResult, Event, Invocation, InvocationError, Yield};

/// Handle to a WAMP session. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Session {
	inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
	config: SessionConfig,
	transport: Arc<dyn Transport>,
	delegate: Option<Arc<dyn SessionDelegate>>,
	state: Mutex<SessionState>,
	events_tx: EventSink,
	events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
}

impl Session {
	pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
		Self::build(config, transport, None)
	}

	pub fn with_delegate(
		config: SessionConfig,
		transport: Arc<dyn Transport>,
		delegate: Arc<dyn SessionDelegate>,
	) -> Self {
		Self::build(config, transport, Some(delegate))
	}

	fn build(config: SessionConfig, transport: Arc<dyn Transport>, delegate: Option<Arc<dyn SessionDelegate>>) -> Self {
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		Self {
			inner: Arc::new(SessionInner {
				config,
				transport,
				delegate,
				state: Mutex::new(SessionState::new()),
				events_tx,
				events_rx: tokio::sync::Mutex::new(events_rx),
			}),
		}
	}

	pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
		Self { inner }
	}

	pub fn config(&self) -> &SessionConfig {
		&self.inner.config
	}

	/// Asks the transport to connect. HELLO goes out once the transport
	/// reports the link is up.
	///
	/// With `auto_reconnect`, a connection lost for any reason other than a
	/// local close or a router ABORT is re-established after the configured
	/// delay.
	///
	/// # Errors
	///
	/// [`Error::InvalidState`] unless the session is idle or closed, or the
	/// transport's own error if it refuses to start.
	pub fn connect(&self, auto_reconnect: bool) -> Result<()> {
		let mut state = self.inner.state.lock();
		match state.status {
			SessionStatus::Idle | SessionStatus::Closed => {}
			status => {
				return Err(Error::InvalidState {
					operation: "connect",
					status,
				});
			}
		}
		state.status = SessionStatus::Connecting;
		state.auto_reconnect = auto_reconnect;
		state.local_close = false;

		if let Err(e) = self.inner.transport.connect(self.inner.events_tx.clone()) {
			state.status = SessionStatus::Closed;
			return Err(e.into());
		}
		debug!(target = "wamp.session", realm = %self.inner.config.realm, auto_reconnect, "connecting");
		Ok(())
	}

	/// Leaves the realm with `wamp.close.close_realm`.
	pub fn disconnect(&self) -> Result<()> {
		self.disconnect_with_reason(uri::CLOSE_REALM)
	}

	/// Sends GOODBYE with `reason`. The session is closed once the router
	/// answers and the transport goes down.
	pub fn disconnect_with_reason(&self, reason: &str) -> Result<()> {
		let mut state = self.inner.state.lock();
		state.ensure_established()?;
		self.inner.send(
			&state,
			&Message::Goodbye {
				details: Dict::new(),
				reason: reason.to_string(),
			},
		)?;
		state.local_close = true;
		state.status = SessionStatus::Closing;
		debug!(target = "wamp.session", reason, "goodbye sent");
		Ok(())
	}

	pub fn is_connected(&self) -> bool {
		self.status() == SessionStatus::Established
	}

	pub fn status(&self) -> SessionStatus {
		self.inner.state.lock().status
	}

	/// Router-assigned session id, while established or closing.
	pub fn session_id(&self) -> Option<Id> {
		self.inner.state.lock().session_id
	}

	/// Roles the router announced in WELCOME.
	pub fn router_roles(&self) -> Vec<Role> {
		self.inner.state.lock().router_roles.clone()
	}

	/// Processes transport events until the connection ends for good.
	///
	/// Returns after a disconnect that is not followed by an automatic
	/// reconnect. Only one `run` makes progress at a time.
	pub async fn run(&self) {
		let mut events = self.inner.events_rx.lock().await;
		while let Some(event) = events.recv().await {
			if self.handle_event(event).await.is_break() {
				break;
			}
		}
		debug!(target = "wamp.session", "event loop finished");
	}

	/// Calls `procedure` and waits for its result.
	///
	/// # Errors
	///
	/// [`Error::Remote`] when the router or callee answered with ERROR,
	/// [`Error::SessionClosed`] when the connection went away first.
	pub async fn call(&self, procedure: &str, options: Dict, args: List, kwargs: Dict) -> Result<CallResult> {
		self.start_request(
			|request| Message::Call {
				request,
				options,
				procedure: procedure.to_string(),
				args,
				kwargs,
			},
			|state, request, reply| state.calls.insert(request, PendingCall { reply }),
		)?
		.wait()
		.await
	}

	/// Subscribes `handler` to `topic`.
	pub async fn subscribe<F>(&self, topic: &str, options: Dict, handler: F) -> Result<Subscription>
	where
		F: Fn(Event) + Send + Sync + 'static,
	{
		self.start_request(
			|request| Message::Subscribe {
				request,
				options,
				topic: topic.to_string(),
			},
			|state, request, reply| {
				state.subscribes.insert(
					request,
					PendingSubscribe {
						topic: topic.to_string(),
						handler: Arc::new(handler),
						reply,
					},
				)
			},
		)?
		.wait()
		.await
	}

	/// Publishes without asking the router for an acknowledgement.
	pub fn publish(&self, topic: &str, options: Dict, args: List, kwargs: Dict) -> Result<()> {
		let mut state = self.inner.state.lock();
		self.inner
			.begin_request(&mut state, |request| Message::Publish {
				request,
				options,
				topic: topic.to_string(),
				args,
				kwargs,
			})
			.map(|_| ())
	}

	/// Publishes with `acknowledge: true` and waits for PUBLISHED.
	pub async fn publish_acknowledged(&self, topic: &str, mut options: Dict, args: List, kwargs: Dict) -> Result<()> {
		options.insert("acknowledge".to_string(), Value::Bool(true));
		self.start_request(
			|request| Message::Publish {
				request,
				options,
				topic: topic.to_string(),
				args,
				kwargs,
			},
			|state, request, reply| state.publishes.insert(request, PendingPublish { reply }),
		)?
		.wait()
		.await
	}

	/// Registers `handler` as the implementation of `procedure`.
	pub async fn register<F>(&self, procedure: &str, options: Dict, handler: F) -> Result<Registration>
	where
		F: Fn(Invocation) -> std::result::Result<Yield, InvocationError> + Send + Sync + 'static,
	{
		self.start_request(
			|request| Message::Register {
				request,
				options,
				procedure: procedure.to_string(),
			},
			|state, request, reply| {
				state.registers.insert(
					request,
					PendingRegister {
						procedure: procedure.to_string(),
						handler: Arc::new(handler),
						reply,
					},
				)
			},
		)?
		.wait()
		.await
	}

	pub(crate) async fn unsubscribe(&self, subscription: Id) -> Result<()> {
		if !self.inner.state.lock().subscriptions.contains(subscription) {
			return Err(Error::HandleInactive {
				kind: HandleKind::Subscription,
				id: subscription,
			});
		}
		self.start_request(
			|request| Message::Unsubscribe { request, subscription },
			|state, request, reply| {
				state.unsubscribes.insert(
					request,
					PendingUnsubscribe {
						subscription,
						reply: Some(reply),
					},
				)
			},
		)?
		.wait()
		.await
	}

	pub(crate) async fn unregister(&self, registration: Id) -> Result<()> {
		if !self.inner.state.lock().registrations.contains(registration) {
			return Err(Error::HandleInactive {
				kind: HandleKind::Registration,
				id: registration,
			});
		}
		self.start_request(
			|request| Message::Unregister { request, registration },
			|state, request, reply| {
				state.unregisters.insert(
					request,
					PendingUnregister {
						registration,
						reply: Some(reply),
					},
				)
			},
		)?
		.wait()
		.await
	}

	/// Allocates a request id, sends the request and records its pending
	/// entry, all under one lock so the reply cannot overtake the entry.
	fn start_request<T>(
		&self,
		message: impl FnOnce(Id) -> Message,
		record: impl FnOnce(&mut SessionState, Id, Reply<T>),
	) -> Result<Awaiting<T>> {
		let mut state = self.inner.state.lock();
		let request = self.inner.begin_request(&mut state, message)?;

		let (tx, rx) = oneshot::channel();
		record(&mut state, request, tx);
		Ok(Awaiting { request, reply: rx })
	}
}

impl SessionInner {
	/// Allocates a request id and sends the request built for it. The caller
	/// records the pending entry before releasing `state`.
	fn begin_request(&self, state: &mut SessionState, message: impl FnOnce(Id) -> Message) -> Result<Id> {
		state.ensure_established()?;
		let request = state.next_request_id();
		self.send(state, &message(request))?;
		Ok(request)
	}

	/// Encodes and hands one message to the transport.
	fn send(&self, state: &SessionState, message: &Message) -> Result<()> {
		let frame = state.encode(message)?;
		debug!(target = "wamp.session", kind = %message.kind(), request = ?message.request_id(), "sending");
		self.transport.send(frame)?;
		Ok(())
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("Session")
			.field("realm", &self.inner.config.realm)
			.field("status", &state.status)
			.field("session_id", &state.session_id)
			.field("outstanding", &state.outstanding())
			.field("subscriptions", &state.subscriptions.len())
			.field("registrations", &state.registrations.len())
			.finish()
	}
}

/// Receiving end of one outstanding request.
struct Awaiting<T> {
	request: Id,
	reply: oneshot::Receiver<Result<T>>,
}

impl<T> Awaiting<T> {
	/// Every pending entry is completed or rejected exactly once, so a dropped
	/// sender means the entry never made it into its table.
	async fn wait(self) -> Result<T> {
		let request = self.request;
		self.reply.await.map_err(|_| Error::RequestDiscarded(request))?
	}
}
