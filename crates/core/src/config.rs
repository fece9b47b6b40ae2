//! Session configuration.
//!
//! Everything the session announces in HELLO plus reconnect behaviour. Can be
//! built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "realm": "realm1",
//!   "authmethods": ["ticket"],
//!   "authid": "joe",
//!   "reconnectDelayMs": 2000
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wamp_protocol::{Dict, Role};

use crate::error::{Error, Result};

/// Agent string announced in HELLO unless overridden.
pub const DEFAULT_AGENT: &str = concat!("wamp-rs-", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
	pub realm: String,
	#[serde(default)]
	pub authmethods: Vec<String>,
	#[serde(default)]
	pub authid: Option<String>,
	#[serde(default)]
	pub authrole: Option<String>,
	#[serde(default)]
	pub authextra: Option<Dict>,
	#[serde(default = "default_agent")]
	pub agent: String,
	#[serde(default = "Role::client_roles")]
	pub roles: Vec<Role>,
	/// Pause before an automatic reconnect.
	#[serde(default)]
	pub reconnect_delay_ms: u64,
}

fn default_agent() -> String {
	DEFAULT_AGENT.to_string()
}

impl SessionConfig {
	pub fn new(realm: impl Into<String>) -> Self {
		Self {
			realm: realm.into(),
			authmethods: Vec::new(),
			authid: None,
			authrole: None,
			authextra: None,
			agent: default_agent(),
			roles: Role::client_roles(),
			reconnect_delay_ms: 0,
		}
	}

	/// Parses a JSON configuration document.
	pub fn from_json(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.realm.trim().is_empty() {
			return Err(Error::Config("realm must not be empty".to_string()));
		}
		if self.roles.is_empty() {
			return Err(Error::Config("at least one role must be announced".to_string()));
		}
		Ok(())
	}

	pub fn authmethods<I, S>(mut self, methods: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.authmethods = methods.into_iter().map(Into::into).collect();
		self
	}

	pub fn authid(mut self, authid: impl Into<String>) -> Self {
		self.authid = Some(authid.into());
		self
	}

	pub fn authrole(mut self, authrole: impl Into<String>) -> Self {
		self.authrole = Some(authrole.into());
		self
	}

	pub fn authextra(mut self, authextra: Dict) -> Self {
		self.authextra = Some(authextra);
		self
	}

	pub fn agent(mut self, agent: impl Into<String>) -> Self {
		self.agent = agent.into();
		self
	}

	pub fn roles(mut self, roles: Vec<Role>) -> Self {
		self.roles = roles;
		self
	}

	pub fn reconnect_delay(mut self, delay: Duration) -> Self {
		self.reconnect_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
		self
	}

	pub fn reconnect_delay_duration(&self) -> Duration {
		Duration::from_millis(self.reconnect_delay_ms)
	}

	/// HELLO details: announced roles, agent and authentication fields.
	pub fn hello_details(&self) -> Dict {
		let mut roles = Dict::new();
		for role in &self.roles {
			roles.insert(role.as_str().to_string(), Value::Object(Dict::new()));
		}

		let mut details = Dict::new();
		if !self.authmethods.is_empty() {
			details.insert(
				"authmethods".to_string(),
				Value::Array(self.authmethods.iter().cloned().map(Value::String).collect()),
			);
		}
		if let Some(authid) = &self.authid {
			details.insert("authid".to_string(), Value::String(authid.clone()));
		}
		if let Some(authrole) = &self.authrole {
			details.insert("authrole".to_string(), Value::String(authrole.clone()));
		}
		if let Some(authextra) = &self.authextra {
			details.insert("authextra".to_string(), Value::Object(authextra.clone()));
		}
		details.insert("agent".to_string(), Value::String(self.agent.clone()));
		details.insert("roles".to_string(), Value::Object(roles));
		details
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn minimal_json_gets_defaults() {
		let config = SessionConfig::from_json(r#"{"realm": "realm1"}"#).unwrap();
		assert_eq!(config, SessionConfig::new("realm1"));
		assert_eq!(config.roles, Role::client_roles());
		assert!(config.agent.starts_with("wamp-rs-"));
	}

	#[test]
	fn json_fields_use_camel_case() {
		let config = SessionConfig::from_json(
			r#"{"realm": "open-realm", "authmethods": ["ticket"], "authid": "joe", "reconnectDelayMs": 250, "roles": ["caller"]}"#,
		)
		.unwrap();
		assert_eq!(config.authmethods, vec!["ticket".to_string()]);
		assert_eq!(config.authid.as_deref(), Some("joe"));
		assert_eq!(config.reconnect_delay_duration(), Duration::from_millis(250));
		assert_eq!(config.roles, vec![Role::Caller]);
	}

	#[test]
	fn empty_realm_is_rejected() {
		assert!(matches!(SessionConfig::from_json(r#"{"realm": " "}"#), Err(Error::Config(_))));
		assert!(matches!(SessionConfig::from_json(r#"{}"#), Err(Error::Json(_))));
	}

	#[test]
	fn hello_details_announce_roles_and_auth() {
		let details = SessionConfig::new("realm1")
			.authmethods(["anonymous"])
			.authid("peter")
			.agent("test-agent")
			.hello_details();

		assert_eq!(
			Value::Object(details),
			json!({
				"authmethods": ["anonymous"],
				"authid": "peter",
				"agent": "test-agent",
				"roles": {"caller": {}, "callee": {}, "publisher": {}, "subscriber": {}},
			})
		);
	}

	#[test]
	fn hello_details_skip_unset_auth_fields() {
		let details = SessionConfig::new("realm1").hello_details();
		assert!(!details.contains_key("authmethods"));
		assert!(!details.contains_key("authid"));
		assert!(!details.contains_key("authrole"));
		assert!(!details.contains_key("authextra"));
	}
}
