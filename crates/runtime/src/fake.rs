//! Fake transport for unit testing session correlation and dispatch.
//!
//! Provides an in-memory transport for testing the session layer without a
//! router.
//!
//! # Example
//!
//! ```ignore
//! let (transport, controller) = FakeTransportBuilder::new().build();
//! let session = Session::new(SessionConfig::new("realm1"), Arc::new(transport));
//!
//! tokio::spawn({
//!     let session = session.clone();
//!     async move { session.run().await }
//! });
//!
//! session.connect(false)?;
//! controller.open();
//! let hello = controller.next_sent().await;
//! controller.inject(&Message::Welcome { session: 9, details: Dict::new() });
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;
use wamp_protocol::{JsonSerializer, List, Message, Serializer, Value};

use crate::error::{Result, TransportError};
use crate::transport::{EventSink, Transport, TransportEvent};

const SENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for creating fake transport instances.
pub struct FakeTransportBuilder {
	serializer: Arc<dyn Serializer>,
	auto_open: bool,
}

impl FakeTransportBuilder {
	/// Create a new fake transport builder using the JSON serializer.
	pub fn new() -> Self {
		Self {
			serializer: Arc::new(JsonSerializer),
			auto_open: false,
		}
	}

	pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
		self.serializer = serializer;
		self
	}

	/// Emit `Connected` as soon as the session asks to connect.
	pub fn auto_open(mut self, auto_open: bool) -> Self {
		self.auto_open = auto_open;
		self
	}

	/// Build the fake transport and return both the transport and a controller.
	///
	/// The [`FakeTransport`] goes to the session; the [`FakeTransportController`]
	/// stays with the test for injecting messages and inspecting sent frames.
	pub fn build(self) -> (FakeTransport, FakeTransportController) {
		let (sent_tx, sent_rx) = mpsc::unbounded_channel();
		let shared = Arc::new(Mutex::new(Shared {
			events: None,
			sent_tx,
			connects: 0,
			disconnects: Vec::new(),
			fail_sends: false,
		}));

		let transport = FakeTransport {
			shared: Arc::clone(&shared),
			serializer: Arc::clone(&self.serializer),
			auto_open: self.auto_open,
		};

		let controller = FakeTransportController {
			shared,
			serializer: self.serializer,
			sent_rx: tokio::sync::Mutex::new(sent_rx),
		};

		(transport, controller)
	}
}

impl Default for FakeTransportBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct Shared {
	events: Option<EventSink>,
	sent_tx: mpsc::UnboundedSender<Vec<u8>>,
	connects: usize,
	disconnects: Vec<String>,
	fail_sends: bool,
}

impl Shared {
	fn emit(&self, event: TransportEvent) -> bool {
		match &self.events {
			Some(events) => events.send(event).is_ok(),
			None => false,
		}
	}
}

/// Transport half handed to the session.
pub struct FakeTransport {
	shared: Arc<Mutex<Shared>>,
	serializer: Arc<dyn Serializer>,
	auto_open: bool,
}

impl Transport for FakeTransport {
	fn connect(&self, events: EventSink) -> Result<()> {
		let mut shared = self.shared.lock();
		if shared.events.is_some() {
			return Err(TransportError::AlreadyConnected);
		}
		shared.connects += 1;
		shared.events = Some(events);
		if self.auto_open {
			shared.emit(TransportEvent::Connected(Arc::clone(&self.serializer)));
		}
		Ok(())
	}

	fn disconnect(&self, reason: &str) {
		let mut shared = self.shared.lock();
		shared.disconnects.push(reason.to_string());
		shared.emit(TransportEvent::Disconnected {
			error: None,
			reason: Some(reason.to_string()),
		});
		shared.events = None;
	}

	fn send(&self, data: Vec<u8>) -> Result<()> {
		let shared = self.shared.lock();
		if shared.events.is_none() {
			return Err(TransportError::NotConnected);
		}
		if shared.fail_sends {
			return Err(TransportError::Closed);
		}
		shared.sent_tx.send(data).map_err(|_| TransportError::Closed)
	}
}

/// Controller for injecting messages and inspecting sent frames.
pub struct FakeTransportController {
	shared: Arc<Mutex<Shared>>,
	serializer: Arc<dyn Serializer>,
	sent_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl FakeTransportController {
	/// Completes a pending connect. Returns `false` if nobody asked to connect.
	pub fn open(&self) -> bool {
		self.shared
			.lock()
			.emit(TransportEvent::Connected(Arc::clone(&self.serializer)))
	}

	/// Inject a message as if the router had sent it.
	pub fn inject(&self, message: &Message) {
		self.inject_array(message.to_array());
	}

	/// Inject a raw positional array, valid or not.
	pub fn inject_array(&self, values: List) {
		match self.serializer.pack(&values) {
			Ok(data) => self.inject_raw(data),
			Err(e) => warn!(target = "wamp.transport", error = %e, "fake transport could not pack injected message"),
		}
	}

	/// Inject raw payload bytes.
	pub fn inject_raw(&self, data: Vec<u8>) {
		self.shared.lock().emit(TransportEvent::Data(data));
	}

	/// Simulate the link dropping underneath the session.
	pub fn drop_connection(&self, error: &str) {
		let mut shared = self.shared.lock();
		shared.emit(TransportEvent::Disconnected {
			error: Some(error.to_string()),
			reason: None,
		});
		shared.events = None;
	}

	/// Make every subsequent `send` fail.
	pub fn fail_sends(&self, fail: bool) {
		self.shared.lock().fail_sends = fail;
	}

	/// Whether the session currently holds an open link.
	pub fn is_connected(&self) -> bool {
		self.shared.lock().events.is_some()
	}

	pub fn connect_count(&self) -> usize {
		self.shared.lock().connects
	}

	/// Reasons passed to `disconnect`, oldest first.
	pub fn disconnect_reasons(&self) -> Vec<String> {
		self.shared.lock().disconnects.clone()
	}

	/// Waits for the next frame the session sent, decoded back to a message.
	///
	/// Returns `None` after a few seconds without traffic, or when the frame
	/// does not decode.
	pub async fn next_sent(&self) -> Option<Message> {
		let values = self.next_sent_array().await?;
		match Message::from_array(values) {
			Ok(message) => Some(message),
			Err(e) => {
				warn!(target = "wamp.transport", error = %e, "session sent an undecodable frame");
				None
			}
		}
	}

	/// Waits for the next frame the session sent, as a raw positional array.
	pub async fn next_sent_array(&self) -> Option<Vec<Value>> {
		let mut rx = self.sent_rx.lock().await;
		let data = tokio::time::timeout(SENT_TIMEOUT, rx.recv()).await.ok()??;
		self.serializer.unpack(&data).ok()
	}

	/// Returns a sent frame if one is already queued, without waiting.
	pub fn try_next_sent(&self) -> Option<Message> {
		let mut rx = self.sent_rx.try_lock().ok()?;
		let data = rx.try_recv().ok()?;
		let values = self.serializer.unpack(&data).ok()?;
		Message::from_array(values).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wamp_protocol::Dict;

	#[tokio::test]
	async fn send_is_captured_and_decoded() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		let (tx, _rx) = mpsc::unbounded_channel();
		transport.connect(tx).unwrap();

		let goodbye = Message::Goodbye {
			details: Dict::new(),
			reason: "wamp.close.close_realm".to_string(),
		};
		let data = JsonSerializer.pack(&goodbye.to_array()).unwrap();
		transport.send(data).unwrap();

		assert_eq!(controller.next_sent().await, Some(goodbye));
		assert_eq!(controller.try_next_sent(), None);
	}

	#[tokio::test]
	async fn open_and_inject_reach_the_event_sink() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		assert!(!controller.open());

		let (tx, mut rx) = mpsc::unbounded_channel();
		transport.connect(tx).unwrap();
		assert!(controller.open());
		controller.inject(&Message::Unsubscribed { request: 4 });

		assert!(matches!(rx.recv().await, Some(TransportEvent::Connected(_))));
		match rx.recv().await {
			Some(TransportEvent::Data(data)) => assert_eq!(data, b"[35,4]".to_vec()),
			other => panic!("expected Data, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn disconnect_emits_reason_and_releases_the_link() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		let (tx, mut rx) = mpsc::unbounded_channel();
		transport.connect(tx).unwrap();

		transport.disconnect("wamp.close.goodbye_and_out");

		match rx.recv().await {
			Some(TransportEvent::Disconnected { error, reason }) => {
				assert_eq!(error, None);
				assert_eq!(reason.as_deref(), Some("wamp.close.goodbye_and_out"));
			}
			other => panic!("expected Disconnected, got {other:?}"),
		}
		assert!(!controller.is_connected());
		assert_eq!(controller.disconnect_reasons(), vec!["wamp.close.goodbye_and_out".to_string()]);
		assert!(matches!(transport.send(b"[]".to_vec()), Err(TransportError::NotConnected)));
	}

	#[test]
	fn second_connect_is_rejected_while_linked() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		let (tx, _rx) = mpsc::unbounded_channel();
		transport.connect(tx.clone()).unwrap();
		assert!(matches!(transport.connect(tx), Err(TransportError::AlreadyConnected)));
		assert_eq!(controller.connect_count(), 1);
	}

	#[tokio::test]
	async fn auto_open_connects_immediately() {
		let (transport, _controller) = FakeTransportBuilder::new().auto_open(true).build();
		let (tx, mut rx) = mpsc::unbounded_channel();
		transport.connect(tx).unwrap();
		match rx.recv().await {
			Some(TransportEvent::Connected(serializer)) => assert_eq!(serializer.subprotocol(), "wamp.2.json"),
			other => panic!("expected Connected, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn failing_sends_surface_as_errors() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		let (tx, _rx) = mpsc::unbounded_channel();
		transport.connect(tx).unwrap();
		controller.fail_sends(true);
		assert!(matches!(transport.send(b"[]".to_vec()), Err(TransportError::Closed)));
	}
}
