//! Transports carrying WAMP messages between a session and its router.
//!
//! A transport moves opaque payloads; it learns which [`Serializer`] to use
//! while connecting and hands it to the session together with the
//! `Connected` notification. See [`Transport`] for the contract.
//!
//! [`Serializer`]: wamp_protocol::Serializer

pub mod error;
pub mod fake;
pub mod transport;
pub mod websocket;

pub use error::{Result, TransportError};
pub use transport::{EventSink, Transport, TransportEvent};
pub use websocket::WebSocketTransport;
