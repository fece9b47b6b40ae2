//! Well-known URIs used by the session layer.

/// Default reason sent with GOODBYE when the application closes the session.
pub const CLOSE_REALM: &str = "wamp.close.close_realm";

/// Reason used to acknowledge a GOODBYE initiated by the other side.
pub const GOODBYE_AND_OUT: &str = "wamp.close.goodbye_and_out";

/// Spelling of [`GOODBYE_AND_OUT`] used by older peers.
pub const LEGACY_GOODBYE_AND_OUT: &str = "wamp.error.goodbye_and_out";

/// Reason sent with ABORT when the session cannot answer a challenge.
pub const SYSTEM_SHUTDOWN: &str = "wamp.error.system_shutdown";

/// Error returned to a caller whose invocation targets no live registration.
pub const NO_SUCH_REGISTRATION: &str = "wamp.error.no_such_registration";

/// Generic failure raised by a callee.
pub const RUNTIME_ERROR: &str = "wamp.error.runtime_error";

/// Returns `true` when `reason` acknowledges a GOODBYE rather than starting one.
pub fn is_goodbye_ack(reason: &str) -> bool {
	reason == GOODBYE_AND_OUT || reason == LEGACY_GOODBYE_AND_OUT
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn both_ack_spellings_are_recognised() {
		assert!(is_goodbye_ack("wamp.close.goodbye_and_out"));
		assert!(is_goodbye_ack("wamp.error.goodbye_and_out"));
		assert!(!is_goodbye_ack(CLOSE_REALM));
	}
}
