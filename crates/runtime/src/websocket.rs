//! WebSocket transport using `tokio-tungstenite`.
//!
//! Connects to a `ws://` or `wss://` router endpoint, negotiating the
//! serializer's subprotocol (`wamp.2.json` for [`JsonSerializer`]). Text
//! frames carry JSON payloads; binary frames are accepted inbound as-is.
//!
//! Each connection runs two tasks: a writer draining the outbound queue into
//! the socket, and a reader forwarding frames to the session. The reader
//! emits the final `Disconnected` event.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, warn};
use wamp_protocol::{JsonSerializer, Serializer};

use crate::error::{Result, TransportError};
use crate::transport::{EventSink, Transport, TransportEvent};

#[derive(Default)]
struct LinkState {
	connecting: bool,
	outbound: Option<mpsc::UnboundedSender<Message>>,
	close_reason: Option<String>,
}

/// WebSocket client transport.
pub struct WebSocketTransport {
	url: String,
	serializer: Arc<dyn Serializer>,
	link: Arc<Mutex<LinkState>>,
}

impl WebSocketTransport {
	/// Creates a transport for `url` using the JSON serializer.
	pub fn new(url: impl Into<String>) -> Self {
		Self::with_serializer(url, Arc::new(JsonSerializer))
	}

	pub fn with_serializer(url: impl Into<String>, serializer: Arc<dyn Serializer>) -> Self {
		Self {
			url: url.into(),
			serializer,
			link: Arc::new(Mutex::new(LinkState::default())),
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}
}

impl Transport for WebSocketTransport {
	fn connect(&self, events: EventSink) -> Result<()> {
		let runtime = tokio::runtime::Handle::try_current().map_err(|e| TransportError::Connect {
			url: self.url.clone(),
			message: e.to_string(),
		})?;

		{
			let mut link = self.link.lock();
			if link.connecting || link.outbound.is_some() {
				return Err(TransportError::AlreadyConnected);
			}
			link.connecting = true;
			link.close_reason = None;
		}

		debug!(target = "wamp.transport", url = %self.url, subprotocol = self.serializer.subprotocol(), "opening WebSocket");
		runtime.spawn(run_connection(
			self.url.clone(),
			Arc::clone(&self.serializer),
			Arc::clone(&self.link),
			events,
		));
		Ok(())
	}

	fn disconnect(&self, reason: &str) {
		let mut link = self.link.lock();
		link.close_reason = Some(reason.to_string());
		match &link.outbound {
			Some(outbound) => {
				debug!(target = "wamp.transport", url = %self.url, reason, "closing WebSocket");
				let _ = outbound.send(Message::Close(None));
			}
			// The connecting task closes right after the handshake.
			None if link.connecting => {}
			None => debug!(target = "wamp.transport", url = %self.url, "disconnect requested while not connected"),
		}
	}

	fn send(&self, data: Vec<u8>) -> Result<()> {
		let frame = if self.serializer.is_text() {
			let text = String::from_utf8(data).map_err(|e| TransportError::InvalidPayload(e.to_string()))?;
			Message::Text(text)
		} else {
			Message::Binary(data)
		};

		let link = self.link.lock();
		let outbound = link.outbound.as_ref().ok_or(TransportError::NotConnected)?;
		outbound.send(frame).map_err(|_| TransportError::Closed)
	}
}

async fn run_connection(url: String, serializer: Arc<dyn Serializer>, link: Arc<Mutex<LinkState>>, events: EventSink) {
	let stream = match open(&url, serializer.subprotocol()).await {
		Ok(stream) => stream,
		Err(e) => {
			warn!(target = "wamp.transport", url = %url, error = %e, "WebSocket connect failed");
			let reason = {
				let mut link = link.lock();
				link.connecting = false;
				link.close_reason.take()
			};
			let _ = events.send(TransportEvent::Disconnected {
				error: Some(e.to_string()),
				reason,
			});
			return;
		}
	};

	let (mut sink, mut source) = stream.split();
	let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

	let close_requested = {
		let mut link = link.lock();
		link.connecting = false;
		link.outbound = Some(outbound_tx.clone());
		link.close_reason.is_some()
	};

	debug!(target = "wamp.transport", url = %url, "WebSocket open");
	let _ = events.send(TransportEvent::Connected(Arc::clone(&serializer)));
	if close_requested {
		let _ = outbound_tx.send(Message::Close(None));
	}
	drop(outbound_tx);

	let writer = tokio::spawn(async move {
		while let Some(frame) = outbound_rx.recv().await {
			let closing = matches!(frame, Message::Close(_));
			if let Err(e) = sink.send(frame).await {
				debug!(target = "wamp.transport", error = %e, "WebSocket write failed");
				break;
			}
			if closing {
				break;
			}
		}
	});

	let mut error = None;
	while let Some(frame) = source.next().await {
		match frame {
			Ok(Message::Text(text)) => {
				if events.send(TransportEvent::Data(text.as_bytes().to_vec())).is_err() {
					break;
				}
			}
			Ok(Message::Binary(data)) => {
				if events.send(TransportEvent::Data(data.to_vec())).is_err() {
					break;
				}
			}
			Ok(Message::Close(frame)) => {
				if let Some(frame) = frame {
					error = Some(format!("closed by peer ({}): {}", u16::from(frame.code), frame.reason));
				}
				break;
			}
			Ok(_) => {}
			Err(e) => {
				error = Some(e.to_string());
				break;
			}
		}
	}

	writer.abort();
	let reason = {
		let mut link = link.lock();
		link.outbound = None;
		link.close_reason.take()
	};
	debug!(target = "wamp.transport", url = %url, ?error, ?reason, "WebSocket closed");
	let _ = events.send(TransportEvent::Disconnected { error, reason });
}

async fn open(
	url: &str,
	subprotocol: &'static str,
) -> std::result::Result<
	tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
	TransportError,
> {
	let mut request = url.into_client_request()?;
	request
		.headers_mut()
		.insert("Sec-WebSocket-Protocol", HeaderValue::from_static(subprotocol));

	let (stream, _response) = tokio_tungstenite::connect_async(request)
		.await
		.map_err(|e| TransportError::Connect {
			url: url.to_string(),
			message: e.to_string(),
		})?;
	Ok(stream)
}
