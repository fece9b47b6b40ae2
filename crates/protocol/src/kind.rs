use std::fmt;

/// Leading discriminant of every WAMP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum MessageKind {
	Hello = 1,
	Welcome = 2,
	Abort = 3,
	Challenge = 4,
	Authenticate = 5,
	Goodbye = 6,
	Error = 8,
	Publish = 16,
	Published = 17,
	Subscribe = 32,
	Subscribed = 33,
	Unsubscribe = 34,
	Unsubscribed = 35,
	Event = 36,
	Call = 48,
	Result = 50,
	Register = 64,
	Registered = 65,
	Unregister = 66,
	Unregistered = 67,
	Invocation = 68,
	Yield = 70,
}

impl MessageKind {
	/// Maps a wire discriminant back to its kind.
	pub fn from_code(code: u64) -> Option<Self> {
		let kind = match code {
			1 => Self::Hello,
			2 => Self::Welcome,
			3 => Self::Abort,
			4 => Self::Challenge,
			5 => Self::Authenticate,
			6 => Self::Goodbye,
			8 => Self::Error,
			16 => Self::Publish,
			17 => Self::Published,
			32 => Self::Subscribe,
			33 => Self::Subscribed,
			34 => Self::Unsubscribe,
			35 => Self::Unsubscribed,
			36 => Self::Event,
			48 => Self::Call,
			50 => Self::Result,
			64 => Self::Register,
			65 => Self::Registered,
			66 => Self::Unregister,
			67 => Self::Unregistered,
			68 => Self::Invocation,
			70 => Self::Yield,
			_ => return None,
		};
		Some(kind)
	}

	pub fn code(self) -> u64 {
		self as u64
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Hello => "HELLO",
			Self::Welcome => "WELCOME",
			Self::Abort => "ABORT",
			Self::Challenge => "CHALLENGE",
			Self::Authenticate => "AUTHENTICATE",
			Self::Goodbye => "GOODBYE",
			Self::Error => "ERROR",
			Self::Publish => "PUBLISH",
			Self::Published => "PUBLISHED",
			Self::Subscribe => "SUBSCRIBE",
			Self::Subscribed => "SUBSCRIBED",
			Self::Unsubscribe => "UNSUBSCRIBE",
			Self::Unsubscribed => "UNSUBSCRIBED",
			Self::Event => "EVENT",
			Self::Call => "CALL",
			Self::Result => "RESULT",
			Self::Register => "REGISTER",
			Self::Registered => "REGISTERED",
			Self::Unregister => "UNREGISTER",
			Self::Unregistered => "UNREGISTERED",
			Self::Invocation => "INVOCATION",
			Self::Yield => "YIELD",
		}
	}
}

impl fmt::Display for MessageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}
