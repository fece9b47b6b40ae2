use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Interaction pattern a peer announces in HELLO/WELCOME details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Caller,
	Callee,
	Publisher,
	Subscriber,
	Dealer,
	Broker,
}

impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Caller => "caller",
			Self::Callee => "callee",
			Self::Publisher => "publisher",
			Self::Subscriber => "subscriber",
			Self::Dealer => "dealer",
			Self::Broker => "broker",
		}
	}

	/// Client roles announced by default in HELLO.
	pub fn client_roles() -> Vec<Role> {
		vec![Self::Caller, Self::Callee, Self::Publisher, Self::Subscriber]
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"caller" => Ok(Self::Caller),
			"callee" => Ok(Self::Callee),
			"publisher" => Ok(Self::Publisher),
			"subscriber" => Ok(Self::Subscriber),
			"dealer" => Ok(Self::Dealer),
			"broker" => Ok(Self::Broker),
			other => Err(format!("unknown role: {other}")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_router_roles() {
		assert_eq!("broker".parse::<Role>(), Ok(Role::Broker));
		assert_eq!("dealer".parse::<Role>(), Ok(Role::Dealer));
		assert!("janitor".parse::<Role>().is_err());
	}

	#[test]
	fn serde_uses_lowercase_names() {
		assert_eq!(serde_json::to_string(&Role::Subscriber).unwrap(), "\"subscriber\"");
		let role: Role = serde_json::from_str("\"callee\"").unwrap();
		assert_eq!(role, Role::Callee);
	}
}
