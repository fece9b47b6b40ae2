//! Transport contract consumed by the session.
//!
//! The session drives a transport with three calls ([`Transport::connect`],
//! [`Transport::disconnect`], [`Transport::send`]) and receives everything
//! the transport has to say as [`TransportEvent`]s on the [`EventSink`] it
//! passed to `connect`. Events from one transport are delivered in order and
//! consumed by a single task, so the session never sees two inbound frames
//! concurrently.
//!
//! # Contract
//!
//! * `connect` starts connecting and returns immediately; success is
//!   signalled with [`TransportEvent::Connected`], failure with
//!   [`TransportEvent::Disconnected`].
//! * `send` never blocks and never calls back into the session.
//! * Every connection ends with exactly one [`TransportEvent::Disconnected`].
//!   When the end was requested through `disconnect(reason)`, that reason is
//!   carried in the event.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use wamp_protocol::Serializer;

use crate::error::Result;

/// Notification from a transport to its session.
pub enum TransportEvent {
	/// The link is up and payloads are encoded with `serializer`.
	Connected(Arc<dyn Serializer>),
	/// The link is gone. `reason` is set when the close was requested through
	/// [`Transport::disconnect`]; `error` describes anything unexpected.
	Disconnected {
		error: Option<String>,
		reason: Option<String>,
	},
	/// One complete inbound payload.
	Data(Vec<u8>),
}

impl fmt::Debug for TransportEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Connected(serializer) => f.debug_tuple("Connected").field(&serializer.subprotocol()).finish(),
			Self::Disconnected { error, reason } => f
				.debug_struct("Disconnected")
				.field("error", error)
				.field("reason", reason)
				.finish(),
			Self::Data(data) => f.debug_tuple("Data").field(&data.len()).finish(),
		}
	}
}

/// Where a transport delivers its notifications.
pub type EventSink = mpsc::UnboundedSender<TransportEvent>;

/// Bidirectional message channel underneath a session.
pub trait Transport: Send + Sync {
	/// Starts connecting; notifications go to `events`.
	fn connect(&self, events: EventSink) -> Result<()>;

	/// Closes the link. A `Disconnected` event carrying `reason` follows.
	fn disconnect(&self, reason: &str);

	/// Queues one outbound payload.
	fn send(&self, data: Vec<u8>) -> Result<()>;
}
