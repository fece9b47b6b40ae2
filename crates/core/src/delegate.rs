//! Application hooks into the session lifecycle.

use wamp_protocol::Dict;

use crate::anomaly::Anomaly;
use crate::session::Session;

/// Receives lifecycle notifications from a [`Session`].
///
/// Every method has a no-op default. Callbacks run on the task driving
/// [`Session::run`] with no session lock held, so they may call back into
/// the session; they should not block.
pub trait SessionDelegate: Send + Sync {
	/// Answers a CHALLENGE. Returning `None` aborts the handshake.
	fn handle_challenge(&self, auth_method: &str, extra: &Dict) -> Option<String> {
		let _ = (auth_method, extra);
		None
	}

	/// The router accepted the session.
	fn connected(&self, session: &Session, session_id: u64) {
		let _ = (session, session_id);
	}

	/// The transport went away. Fires once per connection.
	fn ended(&self, reason: &str) {
		let _ = reason;
	}

	fn anomaly(&self, anomaly: &Anomaly) {
		let _ = anomaly;
	}
}
