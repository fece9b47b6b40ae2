//! Test harness: a session wired to the fake transport, with a delegate that
//! records every notification.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wamp::{Anomaly, Dict, Session, SessionConfig, SessionDelegate};
use wamp_protocol::Message;
use wamp_runtime::fake::{FakeTransportBuilder, FakeTransportController};

const NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

pub const SESSION_ID: u64 = 9;

/// Everything the delegate was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
	Challenge { method: String, extra: Dict },
	Connected(u64),
	Ended(String),
	Anomaly(Anomaly),
}

struct Recorder {
	signature: Option<String>,
	notices: mpsc::UnboundedSender<Notice>,
}

impl SessionDelegate for Recorder {
	fn handle_challenge(&self, auth_method: &str, extra: &Dict) -> Option<String> {
		let _ = self.notices.send(Notice::Challenge {
			method: auth_method.to_string(),
			extra: extra.clone(),
		});
		self.signature.clone()
	}

	fn connected(&self, _session: &Session, session_id: u64) {
		let _ = self.notices.send(Notice::Connected(session_id));
	}

	fn ended(&self, reason: &str) {
		let _ = self.notices.send(Notice::Ended(reason.to_string()));
	}

	fn anomaly(&self, anomaly: &Anomaly) {
		let _ = self.notices.send(Notice::Anomaly(anomaly.clone()));
	}
}

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::DEBUG)
		.with_test_writer()
		.try_init();
}

pub struct Harness {
	pub session: Session,
	pub router: FakeTransportController,
	pub run: JoinHandle<()>,
	notices: mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
	pub fn new() -> Self {
		Self::with(SessionConfig::new("realm1"), None)
	}

	/// Harness whose delegate answers every challenge with `signature`.
	pub fn with_signature(signature: &str) -> Self {
		Self::with(SessionConfig::new("realm1"), Some(signature))
	}

	pub fn with(config: SessionConfig, signature: Option<&str>) -> Self {
		init_tracing();
		let (transport, router) = FakeTransportBuilder::new().build();
		let (tx, notices) = mpsc::unbounded_channel();
		let recorder = Recorder {
			signature: signature.map(str::to_string),
			notices: tx,
		};
		let session = Session::with_delegate(config, Arc::new(transport), Arc::new(recorder));
		let run = tokio::spawn({
			let session = session.clone();
			async move { session.run().await }
		});
		Self {
			session,
			router,
			run,
			notices,
		}
	}

	pub async fn notice(&mut self) -> Notice {
		tokio::time::timeout(NOTICE_TIMEOUT, self.notices.recv())
			.await
			.expect("delegate notification should arrive")
			.expect("delegate channel should stay open")
	}

	pub fn no_notice(&mut self) -> bool {
		self.notices.try_recv().is_err()
	}

	pub async fn sent(&self) -> Message {
		self.router.next_sent().await.expect("session should have sent a frame")
	}

	/// Connects, opens the link and waits for HELLO.
	pub async fn open(&mut self, auto_reconnect: bool) -> Message {
		self.session.connect(auto_reconnect).expect("connect should start");
		assert!(self.router.open(), "session should have asked the transport to connect");
		let hello = self.sent().await;
		assert!(matches!(hello, Message::Hello { .. }), "expected HELLO, got {hello:?}");
		hello
	}

	/// Runs the whole handshake up to `connected(SESSION_ID)`.
	pub async fn establish(&mut self) {
		self.open(false).await;
		self.welcome().await;
	}

	pub async fn welcome(&mut self) {
		self.router.inject(&Message::Welcome {
			session: SESSION_ID,
			details: dict(json!({"roles": {"broker": {}, "dealer": {}}})),
		});
		assert_eq!(self.notice().await, Notice::Connected(SESSION_ID));
	}

	/// Waits for `run` to return.
	pub async fn finished(self) {
		tokio::time::timeout(NOTICE_TIMEOUT, self.run)
			.await
			.expect("run should return")
			.expect("run should not panic");
	}
}

/// Builds a dict from a JSON object literal.
pub fn dict(value: serde_json::Value) -> Dict {
	match value {
		serde_json::Value::Object(map) => map,
		other => panic!("expected a JSON object, got {other}"),
	}
}

/// Request id of an outbound request message.
pub fn request_id(message: &Message) -> u64 {
	message.request_id().expect("message should carry a request id")
}
