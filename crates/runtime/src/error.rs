use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("failed to connect to {url}: {message}")]
	Connect { url: String, message: String },

	#[error("transport is already connected")]
	AlreadyConnected,

	#[error("transport is not connected")]
	NotConnected,

	#[error("transport closed")]
	Closed,

	#[error("payload is not valid for a text frame: {0}")]
	InvalidPayload(String),

	#[error("WebSocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
