//! Inbound side of the session: transport events and router messages.
//!
//! Everything here runs on the task driving [`Session::run`]. State is only
//! touched under the session lock, and the lock is always released before
//! handlers or delegate callbacks run.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};
use wamp_protocol::{Dict, Id, List, Message, MessageKind, Serializer, uri};
use wamp_runtime::TransportEvent;

use super::state::{SessionStatus, router_roles};
use super::Session;
use crate::anomaly::Anomaly;
use crate::error::{Error, HandleKind, RemoteError};
use crate::pending::{Continuation, PendingUnregister, PendingUnsubscribe};
use crate::registration::Registration;
use crate::subscription::Subscription;
use crate::types::{CallResult, Event, Invocation};

/// Transport disconnect reason used when a challenge cannot be answered.
const NO_CHALLENGE_HANDLER: &str = "No challenge handler found.";

impl Session {
	/// Handles one transport event. Breaks once the session is closed and no
	/// reconnect follows.
	pub(super) async fn handle_event(&self, event: TransportEvent) -> ControlFlow<()> {
		match event {
			TransportEvent::Connected(serializer) => {
				self.on_connected(serializer);
				ControlFlow::Continue(())
			}
			TransportEvent::Data(data) => {
				self.on_data(&data);
				ControlFlow::Continue(())
			}
			TransportEvent::Disconnected { error, reason } => self.on_disconnected(error, reason).await,
		}
	}

	fn on_connected(&self, serializer: Arc<dyn Serializer>) {
		let mut state = self.inner.state.lock();
		if state.status != SessionStatus::Connecting {
			warn!(target = "wamp.session", status = %state.status, "transport connected while not connecting");
		}
		debug!(target = "wamp.session", subprotocol = serializer.subprotocol(), "transport connected");
		state.serializer = Some(serializer);

		let hello = Message::Hello {
			realm: self.inner.config.realm.clone(),
			details: self.inner.config.hello_details(),
		};
		if let Err(e) = self.inner.send(&state, &hello) {
			error!(target = "wamp.session", error = %e, "failed to send HELLO");
		}
	}

	fn on_data(&self, data: &[u8]) {
		let Some(serializer) = self.inner.state.lock().serializer.clone() else {
			warn!(target = "wamp.session", len = data.len(), "payload received before transport connected");
			return;
		};
		let values = match serializer.unpack(data) {
			Ok(values) => values,
			Err(e) => return self.report(Anomaly::Unpack(e)),
		};
		match Message::from_array(values) {
			Ok(message) => self.dispatch(message),
			Err(e) => self.report(Anomaly::Malformed(e)),
		}
	}

	fn dispatch(&self, message: Message) {
		debug!(target = "wamp.session", kind = %message.kind(), request = ?message.request_id(), "received");
		match message {
			Message::Welcome { session, details } => self.on_welcome(session, &details),
			Message::Challenge { auth_method, extra } => self.on_challenge(&auth_method, &extra),
			Message::Abort { details: _, reason } => self.on_abort(&reason),
			Message::Goodbye { details: _, reason } => self.on_goodbye(&reason),
			Message::Result {
				request,
				details,
				args,
				kwargs,
			} => self.on_result(request, CallResult { details, args, kwargs }),
			Message::Subscribed { request, subscription } => self.on_subscribed(request, subscription),
			Message::Unsubscribed { request } => self.on_unsubscribed(request),
			Message::Published { request, publication } => self.on_published(request, publication),
			Message::Registered { request, registration } => self.on_registered(request, registration),
			Message::Unregistered { request } => self.on_unregistered(request),
			Message::Event {
				subscription,
				publication,
				details,
				args,
				kwargs,
			} => self.on_event(subscription, publication, details, args, kwargs),
			Message::Invocation {
				request,
				registration,
				details,
				args,
				kwargs,
			} => self.on_invocation(request, registration, details, args, kwargs),
			Message::Error {
				request_type,
				request,
				details,
				error,
				args,
				kwargs,
			} => self.on_error(
				request_type,
				request,
				RemoteError {
					details,
					error,
					args,
					kwargs,
				},
			),
			other => self.unexpected(other.kind()),
		}
	}

	fn on_welcome(&self, session: Id, details: &Dict) {
		{
			let mut state = self.inner.state.lock();
			if state.status != SessionStatus::Connecting {
				let status = state.status;
				drop(state);
				return self.report(Anomaly::UnexpectedMessage {
					kind: MessageKind::Welcome,
					status,
				});
			}
			state.status = SessionStatus::Established;
			state.session_id = Some(session);
			state.router_roles = router_roles(details);
		}
		info!(target = "wamp.session", session, realm = %self.inner.config.realm, "session established");
		if let Some(delegate) = &self.inner.delegate {
			delegate.connected(self, session);
		}
	}

	fn on_challenge(&self, auth_method: &str, extra: &Dict) {
		let status = self.status();
		if status != SessionStatus::Connecting {
			return self.report(Anomaly::UnexpectedMessage {
				kind: MessageKind::Challenge,
				status,
			});
		}

		let signature = self
			.inner
			.delegate
			.as_ref()
			.and_then(|delegate| delegate.handle_challenge(auth_method, extra));

		let mut state = self.inner.state.lock();
		match signature {
			Some(signature) => {
				debug!(target = "wamp.session", auth_method, "answering challenge");
				let authenticate = Message::Authenticate {
					signature,
					extra: Dict::new(),
				};
				if let Err(e) = self.inner.send(&state, &authenticate) {
					error!(target = "wamp.session", error = %e, "failed to send AUTHENTICATE");
				}
			}
			None => {
				warn!(target = "wamp.session", auth_method, "no answer to challenge; aborting");
				let abort = Message::Abort {
					details: Dict::new(),
					reason: uri::SYSTEM_SHUTDOWN.to_string(),
				};
				if let Err(e) = self.inner.send(&state, &abort) {
					error!(target = "wamp.session", error = %e, "failed to send ABORT");
				}
				state.status = SessionStatus::Closed;
				state.local_close = true;
				drop(state);
				self.inner.transport.disconnect(NO_CHALLENGE_HANDLER);
			}
		}
	}

	fn on_abort(&self, reason: &str) {
		{
			let mut state = self.inner.state.lock();
			match state.status {
				SessionStatus::Connecting | SessionStatus::Established => {}
				status => {
					drop(state);
					return self.report(Anomaly::UnexpectedMessage {
						kind: MessageKind::Abort,
						status,
					});
				}
			}
			state.status = SessionStatus::Closed;
			state.session_id = None;
			state.local_close = true;
		}
		info!(target = "wamp.session", reason, "session aborted by router");
		self.inner.transport.disconnect(reason);
	}

	fn on_goodbye(&self, reason: &str) {
		{
			let mut state = self.inner.state.lock();
			match state.status {
				SessionStatus::Established => {
					if !uri::is_goodbye_ack(reason) {
						let ack = Message::Goodbye {
							details: Dict::new(),
							reason: uri::GOODBYE_AND_OUT.to_string(),
						};
						if let Err(e) = self.inner.send(&state, &ack) {
							warn!(target = "wamp.session", error = %e, "failed to acknowledge GOODBYE");
						}
					}
					info!(target = "wamp.session", reason, "router closed the session");
				}
				SessionStatus::Closing => {
					info!(target = "wamp.session", reason, "session closed");
				}
				status => {
					drop(state);
					return self.report(Anomaly::UnexpectedMessage {
						kind: MessageKind::Goodbye,
						status,
					});
				}
			}
			state.status = SessionStatus::Closed;
			state.session_id = None;
		}
		self.inner.transport.disconnect(reason);
	}

	fn on_result(&self, request: Id, result: CallResult) {
		if let Some(pending) = self.take_reply(MessageKind::Result, request, |state, id| state.calls.take(id)) {
			let _ = pending.reply.send(Ok(result));
		}
	}

	fn on_subscribed(&self, request: Id, subscription: Id) {
		let mut state = self.inner.state.lock();
		if !state.status.accepts_replies() {
			let status = state.status;
			drop(state);
			return self.unexpected_in(MessageKind::Subscribed, status);
		}
		let Some(pending) = state.subscribes.take(request) else {
			drop(state);
			return self.unknown_request(MessageKind::Subscribed, request);
		};

		let handle = Subscription::new(subscription, pending.topic, Arc::downgrade(&self.inner), pending.handler);
		if let Some(displaced) = state.subscriptions.register(subscription, handle.clone()) {
			warn!(target = "wamp.session", subscription, topic = displaced.topic(), "router reused a live subscription id");
			displaced.invalidate();
		}
		drop(state);
		debug!(target = "wamp.session", subscription, topic = handle.topic(), "subscribed");
		if let Err(Ok(orphan)) = pending.reply.send(Ok(handle)) {
			self.release_subscription(orphan);
		}
	}

	/// Drops a subscription its requester stopped waiting for and tells the
	/// router to do the same.
	fn release_subscription(&self, handle: Subscription) {
		let subscription = handle.id();
		let mut state = self.inner.state.lock();
		state.subscriptions.remove(subscription);
		handle.invalidate();
		warn!(target = "wamp.session", subscription, topic = handle.topic(), "subscriber went away; unsubscribing");
		let sent = self.inner.begin_request(&mut state, |request| Message::Unsubscribe { request, subscription });
		match sent {
			Ok(request) => state.unsubscribes.insert(
				request,
				PendingUnsubscribe {
					subscription,
					reply: None,
				},
			),
			Err(e) => warn!(target = "wamp.session", subscription, error = %e, "could not unsubscribe"),
		}
	}

	fn on_unsubscribed(&self, request: Id) {
		let mut state = self.inner.state.lock();
		if !state.status.accepts_replies() {
			let status = state.status;
			drop(state);
			return self.unexpected_in(MessageKind::Unsubscribed, status);
		}
		let Some(pending) = state.unsubscribes.take(request) else {
			drop(state);
			return self.unknown_request(MessageKind::Unsubscribed, request);
		};
		let removed = state.subscriptions.remove(pending.subscription);
		drop(state);

		match (removed, pending.reply) {
			(Some(subscription), reply) => {
				subscription.invalidate();
				debug!(target = "wamp.session", subscription = subscription.id(), "unsubscribed");
				if let Some(reply) = reply {
					let _ = reply.send(Ok(()));
				}
			}
			(None, None) => debug!(target = "wamp.session", subscription = pending.subscription, "released subscription"),
			(None, Some(reply)) => {
				let kind = HandleKind::Subscription;
				let id = pending.subscription;
				self.report(Anomaly::HandleGone { kind, id });
				reply.reject(Error::HandleInactive { kind, id });
			}
		}
	}

	fn on_published(&self, request: Id, publication: Id) {
		if let Some(pending) = self.take_reply(MessageKind::Published, request, |state, id| state.publishes.take(id)) {
			debug!(target = "wamp.session", request, publication, "publication acknowledged");
			let _ = pending.reply.send(Ok(()));
		}
	}

	fn on_registered(&self, request: Id, registration: Id) {
		let mut state = self.inner.state.lock();
		if !state.status.accepts_replies() {
			let status = state.status;
			drop(state);
			return self.unexpected_in(MessageKind::Registered, status);
		}
		let Some(pending) = state.registers.take(request) else {
			drop(state);
			return self.unknown_request(MessageKind::Registered, request);
		};

		let handle = Registration::new(registration, pending.procedure, Arc::downgrade(&self.inner), pending.handler);
		if let Some(displaced) = state.registrations.register(registration, handle.clone()) {
			warn!(target = "wamp.session", registration, procedure = displaced.procedure(), "router reused a live registration id");
			displaced.invalidate();
		}
		drop(state);
		debug!(target = "wamp.session", registration, procedure = handle.procedure(), "registered");
		if let Err(Ok(orphan)) = pending.reply.send(Ok(handle)) {
			self.release_registration(orphan);
		}
	}

	/// Drops a registration its requester stopped waiting for and tells the
	/// router to do the same.
	fn release_registration(&self, handle: Registration) {
		let registration = handle.id();
		let mut state = self.inner.state.lock();
		state.registrations.remove(registration);
		handle.invalidate();
		warn!(target = "wamp.session", registration, procedure = handle.procedure(), "callee went away; unregistering");
		let sent = self.inner.begin_request(&mut state, |request| Message::Unregister { request, registration });
		match sent {
			Ok(request) => state.unregisters.insert(
				request,
				PendingUnregister {
					registration,
					reply: None,
				},
			),
			Err(e) => warn!(target = "wamp.session", registration, error = %e, "could not unregister"),
		}
	}

	fn on_unregistered(&self, request: Id) {
		let mut state = self.inner.state.lock();
		if !state.status.accepts_replies() {
			let status = state.status;
			drop(state);
			return self.unexpected_in(MessageKind::Unregistered, status);
		}
		let Some(pending) = state.unregisters.take(request) else {
			drop(state);
			return self.unknown_request(MessageKind::Unregistered, request);
		};
		let removed = state.registrations.remove(pending.registration);
		drop(state);

		match (removed, pending.reply) {
			(Some(registration), reply) => {
				registration.invalidate();
				debug!(target = "wamp.session", registration = registration.id(), "unregistered");
				if let Some(reply) = reply {
					let _ = reply.send(Ok(()));
				}
			}
			(None, None) => debug!(target = "wamp.session", registration = pending.registration, "released registration"),
			(None, Some(reply)) => {
				let kind = HandleKind::Registration;
				let id = pending.registration;
				self.report(Anomaly::HandleGone { kind, id });
				reply.reject(Error::HandleInactive { kind, id });
			}
		}
	}

	fn on_event(&self, subscription: Id, publication: Id, mut details: Dict, args: List, kwargs: Dict) {
		let handle = {
			let state = self.inner.state.lock();
			if !state.status.accepts_replies() {
				let status = state.status;
				drop(state);
				return self.unexpected_in(MessageKind::Event, status);
			}
			state.subscriptions.lookup(subscription).cloned()
		};
		let Some(handle) = handle else {
			return self.report(Anomaly::UnknownSubscription(subscription));
		};

		if !details.is_empty() {
			details.insert("topic".to_string(), Value::String(handle.topic().to_string()));
		}
		let handler = handle.handler();
		handler(Event {
			subscription,
			publication,
			topic: handle.topic().to_string(),
			details,
			args,
			kwargs,
		});
	}

	fn on_invocation(&self, request: Id, registration: Id, details: Dict, args: List, kwargs: Dict) {
		let handle = {
			let state = self.inner.state.lock();
			if !state.status.accepts_replies() {
				let status = state.status;
				drop(state);
				return self.unexpected_in(MessageKind::Invocation, status);
			}
			state.registrations.lookup(registration).cloned()
		};

		let reply = match handle {
			Some(handle) => {
				let handler = handle.handler();
				let outcome = handler(Invocation {
					request,
					registration,
					procedure: handle.procedure().to_string(),
					details,
					args,
					kwargs,
				});
				match outcome {
					Ok(result) => Message::Yield {
						request,
						options: result.options,
						args: result.args,
						kwargs: result.kwargs,
					},
					Err(failure) => Message::Error {
						request_type: MessageKind::Invocation.code(),
						request,
						details: failure.details,
						error: failure.error,
						args: failure.args,
						kwargs: failure.kwargs,
					},
				}
			}
			None => {
				self.report(Anomaly::UnknownRegistration(registration));
				Message::Error {
					request_type: MessageKind::Invocation.code(),
					request,
					details: Dict::new(),
					error: uri::NO_SUCH_REGISTRATION.to_string(),
					args: List::new(),
					kwargs: Dict::new(),
				}
			}
		};

		let state = self.inner.state.lock();
		if let Err(e) = self.inner.send(&state, &reply) {
			warn!(target = "wamp.session", request, error = %e, "could not answer invocation");
		}
	}

	fn on_error(&self, request_type: u64, request: Id, remote: RemoteError) {
		let kind = match MessageKind::from_code(request_type) {
			Some(
				kind @ (MessageKind::Call
				| MessageKind::Subscribe
				| MessageKind::Unsubscribe
				| MessageKind::Publish
				| MessageKind::Register
				| MessageKind::Unregister),
			) => kind,
			_ => {
				return self.report(Anomaly::UnknownErrorKind {
					request_type,
					request_id: request,
				});
			}
		};

		let mut state = self.inner.state.lock();
		if !state.status.accepts_replies() {
			let status = state.status;
			drop(state);
			return self.unexpected_in(MessageKind::Error, status);
		}
		debug!(target = "wamp.session", request, request_kind = %kind, error = %remote.error, "request failed");
		let error = Error::Remote(remote);
		let found = match kind {
			MessageKind::Call => state.calls.take(request).map(|p| p.reject(error)),
			MessageKind::Subscribe => state.subscribes.take(request).map(|p| p.reject(error)),
			MessageKind::Unsubscribe => state.unsubscribes.take(request).map(|p| p.reject(error)),
			MessageKind::Publish => state.publishes.take(request).map(|p| p.reject(error)),
			MessageKind::Register => state.registers.take(request).map(|p| p.reject(error)),
			_ => state.unregisters.take(request).map(|p| p.reject(error)),
		};
		drop(state);
		if found.is_none() {
			self.unknown_request(MessageKind::Error, request);
		}
	}

	async fn on_disconnected(&self, error: Option<String>, reason: Option<String>) -> ControlFlow<()> {
		let reason = match (reason, error) {
			(Some(reason), _) => reason,
			(None, Some(error)) => format!("Unexpected error: {error}"),
			(None, None) => "Unknown error.".to_string(),
		};

		let reconnect = {
			let mut state = self.inner.state.lock();
			let failed = state.teardown(&reason);
			if failed > 0 {
				debug!(target = "wamp.session", failed, "failed outstanding requests");
			}
			state.auto_reconnect && !state.local_close
		};
		info!(target = "wamp.session", reason = %reason, reconnect, "session ended");
		if let Some(delegate) = &self.inner.delegate {
			delegate.ended(&reason);
		}

		if !reconnect {
			return ControlFlow::Break(());
		}
		tokio::time::sleep(self.inner.config.reconnect_delay_duration()).await;
		if self.status() != SessionStatus::Closed {
			// Someone reconnected during the delay.
			return ControlFlow::Continue(());
		}
		match self.connect(true) {
			Ok(()) => ControlFlow::Continue(()),
			Err(e) => {
				warn!(target = "wamp.session", error = %e, "reconnect failed");
				ControlFlow::Break(())
			}
		}
	}

	/// Takes a pending entry for a plain reply, reporting unknown ids and
	/// replies that arrive outside an established session.
	fn take_reply<T>(
		&self,
		kind: MessageKind,
		request: Id,
		take: impl FnOnce(&mut super::SessionState, Id) -> Option<T>,
	) -> Option<T> {
		let mut state = self.inner.state.lock();
		if !state.status.accepts_replies() {
			let status = state.status;
			drop(state);
			self.unexpected_in(kind, status);
			return None;
		}
		let entry = take(&mut state, request);
		drop(state);
		if entry.is_none() {
			self.unknown_request(kind, request);
		}
		entry
	}

	fn unexpected(&self, kind: MessageKind) {
		let status = self.status();
		self.unexpected_in(kind, status);
	}

	fn unexpected_in(&self, kind: MessageKind, status: SessionStatus) {
		self.report(Anomaly::UnexpectedMessage { kind, status });
	}

	fn unknown_request(&self, kind: MessageKind, request_id: Id) {
		self.report(Anomaly::UnknownRequest { kind, request_id });
	}

	/// Logs an anomaly and forwards it to the delegate. Never called with the
	/// session lock held.
	fn report(&self, anomaly: Anomaly) {
		warn!(target = "wamp.session", anomaly = %anomaly, "dropping message");
		if let Some(delegate) = &self.inner.delegate {
			delegate.anomaly(&anomaly);
		}
	}
}
