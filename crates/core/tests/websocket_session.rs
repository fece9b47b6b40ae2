//! End-to-end session over a real WebSocket against a scripted router.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use wamp::{Dict, Session, SessionConfig, SessionDelegate};
use wamp_runtime::WebSocketTransport;

struct Lifecycle(mpsc::UnboundedSender<String>);

impl SessionDelegate for Lifecycle {
	fn connected(&self, _session: &Session, session_id: u64) {
		let _ = self.0.send(format!("connected {session_id}"));
	}

	fn ended(&self, reason: &str) {
		let _ = self.0.send(format!("ended {reason}"));
	}
}

fn parse(frame: Frame) -> Vec<Value> {
	let text = frame.into_text().expect("router expects text frames");
	serde_json::from_str(&text).expect("frame should be a JSON array")
}

async fn lifecycle(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
	tokio::time::timeout(Duration::from_secs(5), rx.recv())
		.await
		.expect("lifecycle notification")
		.expect("delegate channel open")
}

#[tokio::test]
async fn call_over_websocket() -> anyhow::Result<()> {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();

	let listener = TcpListener::bind("127.0.0.1:0").await?;
	let addr = listener.local_addr()?;

	let router = tokio::spawn(async move {
		let (stream, _) = listener.accept().await.expect("accept");
		let ws = tokio_tungstenite::accept_hdr_async(stream, |_: &Request, mut response: Response| {
			response
				.headers_mut()
				.insert("Sec-WebSocket-Protocol", HeaderValue::from_static("wamp.2.json"));
			Ok(response)
		})
		.await
		.expect("handshake");
		let (mut tx, mut rx) = ws.split();

		let hello = parse(rx.next().await.expect("hello").expect("hello frame"));
		assert_eq!(hello[0], json!(1));
		assert_eq!(hello[1], json!("realm1"));
		tx.send(Frame::Text(json!([2, 9, {"roles": {"dealer": {}}}]).to_string()))
			.await
			.expect("send welcome");

		let call = parse(rx.next().await.expect("call").expect("call frame"));
		assert_eq!(call[0], json!(48));
		assert_eq!(call[3], json!("org.test.add"));
		assert_eq!(call[4], json!([1, 1]));
		let request = call[1].clone();
		tx.send(Frame::Text(json!([50, request, {}, [2]]).to_string()))
			.await
			.expect("send result");

		let goodbye = parse(rx.next().await.expect("goodbye").expect("goodbye frame"));
		assert_eq!(goodbye, vec![json!(6), json!({}), json!("wamp.close.close_realm")]);
		tx.send(Frame::Text(json!([6, {}, "wamp.close.goodbye_and_out"]).to_string()))
			.await
			.expect("send goodbye");

		while let Some(Ok(frame)) = rx.next().await {
			if frame.is_close() {
				break;
			}
		}
	});

	let (events_tx, mut events) = mpsc::unbounded_channel();
	let transport = Arc::new(WebSocketTransport::new(format!("ws://{addr}/ws")));
	let session = Session::with_delegate(SessionConfig::new("realm1"), transport, Arc::new(Lifecycle(events_tx)));
	let run = tokio::spawn({
		let session = session.clone();
		async move { session.run().await }
	});

	session.connect(false)?;
	assert_eq!(lifecycle(&mut events).await, "connected 9");

	let result = session
		.call("org.test.add", Dict::new(), vec![json!(1), json!(1)], Dict::new())
		.await?;
	assert_eq!(result.args, vec![json!(2)]);

	session.disconnect()?;
	assert_eq!(lifecycle(&mut events).await, "ended wamp.close.goodbye_and_out");

	tokio::time::timeout(Duration::from_secs(5), run).await??;
	router.await?;
	Ok(())
}
