mod common;

use std::time::Duration;

use common::{Harness, Notice, dict, request_id};
use serde_json::json;
use tokio::sync::mpsc;
use wamp::{Anomaly, Dict, Error, Event, HandleKind, Subscription};
use wamp_protocol::{Message, MessageKind};

const TOPIC: &str = "com.myapp.topic1";

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
	tokio::time::timeout(Duration::from_secs(5), events.recv())
		.await
		.expect("event should be delivered")
		.expect("handler channel open")
}

/// Subscribes to [`TOPIC`] and confirms with `subscription_id`.
async fn subscribe(h: &Harness, subscription_id: u64) -> (Subscription, mpsc::UnboundedReceiver<Event>) {
	let (tx, rx) = mpsc::unbounded_channel();
	let pending = tokio::spawn({
		let session = h.session.clone();
		async move {
			session
				.subscribe(TOPIC, Dict::new(), move |event| {
					let _ = tx.send(event);
				})
				.await
		}
	});

	let sent = h.sent().await;
	let request = request_id(&sent);
	assert_eq!(
		sent,
		Message::Subscribe {
			request,
			options: Dict::new(),
			topic: TOPIC.to_string(),
		}
	);
	h.router.inject(&Message::Subscribed {
		request,
		subscription: subscription_id,
	});

	let subscription = pending.await.expect("subscribe task").expect("subscribe should succeed");
	(subscription, rx)
}

fn event(subscription: u64, publication: u64, details: Dict) -> Message {
	Message::Event {
		subscription,
		publication,
		details,
		args: vec![json!("hello")],
		kwargs: Dict::new(),
	}
}

#[tokio::test]
async fn subscribed_handle_receives_events() {
	let mut h = Harness::new();
	h.establish().await;

	let (subscription, mut events) = subscribe(&h, 77).await;
	assert_eq!(subscription.id(), 77);
	assert_eq!(subscription.topic(), TOPIC);
	assert!(subscription.is_active());

	h.router.inject(&event(77, 1001, dict(json!({"publisher": 5}))));
	let received = next_event(&mut events).await;
	assert_eq!(received.subscription, 77);
	assert_eq!(received.publication, 1001);
	assert_eq!(received.topic, TOPIC);
	assert_eq!(received.args, vec![json!("hello")]);
	assert_eq!(received.details.get("topic"), Some(&json!(TOPIC)));
	assert_eq!(received.details.get("publisher"), Some(&json!(5)));
}

#[tokio::test]
async fn empty_event_details_stay_empty() {
	let mut h = Harness::new();
	h.establish().await;
	let (_subscription, mut events) = subscribe(&h, 12).await;

	h.router.inject(&event(12, 1, Dict::new()));
	assert!(next_event(&mut events).await.details.is_empty());
}

#[tokio::test]
async fn rebind_routes_later_events_to_the_new_handler() {
	let mut h = Harness::new();
	h.establish().await;
	let (subscription, mut first) = subscribe(&h, 21).await;

	let (tx, mut second) = mpsc::unbounded_channel();
	subscription.rebind(move |event| {
		let _ = tx.send(event);
	});

	h.router.inject(&event(21, 2, Dict::new()));
	assert_eq!(next_event(&mut second).await.publication, 2);
	assert!(first.try_recv().is_err());
}

#[tokio::test]
async fn cancel_unsubscribes_and_deactivates_the_handle() {
	let mut h = Harness::new();
	h.establish().await;
	let (subscription, _events) = subscribe(&h, 33).await;

	let cancel = tokio::spawn({
		let subscription = subscription.clone();
		async move { subscription.cancel().await }
	});
	let sent = h.sent().await;
	let request = request_id(&sent);
	assert_eq!(sent, Message::Unsubscribe { request, subscription: 33 });

	h.router.inject(&Message::Unsubscribed { request });
	cancel.await.expect("cancel task").expect("cancel should succeed");
	assert!(!subscription.is_active());

	h.router.inject(&event(33, 3, Dict::new()));
	assert_eq!(h.notice().await, Notice::Anomaly(Anomaly::UnknownSubscription(33)));

	assert!(matches!(
		subscription.cancel().await,
		Err(Error::HandleInactive {
			kind: HandleKind::Subscription,
			id: 33
		})
	));
	assert_eq!(h.router.try_next_sent(), None);
}

#[tokio::test]
async fn concurrent_cancels_succeed_once() {
	let mut h = Harness::new();
	h.establish().await;
	let (subscription, _events) = subscribe(&h, 34).await;

	let first = tokio::spawn({
		let subscription = subscription.clone();
		async move { subscription.cancel().await }
	});
	let first_request = request_id(&h.sent().await);
	let second = tokio::spawn({
		let subscription = subscription.clone();
		async move { subscription.cancel().await }
	});
	let second_request = request_id(&h.sent().await);

	h.router.inject(&Message::Unsubscribed { request: first_request });
	h.router.inject(&Message::Unsubscribed { request: second_request });

	assert!(first.await.expect("first cancel").is_ok());
	assert!(matches!(
		second.await.expect("second cancel"),
		Err(Error::HandleInactive {
			kind: HandleKind::Subscription,
			id: 34
		})
	));
	assert_eq!(
		h.notice().await,
		Notice::Anomaly(Anomaly::HandleGone {
			kind: HandleKind::Subscription,
			id: 34
		})
	);
}

#[tokio::test]
async fn abandoned_subscribe_is_released() {
	let mut h = Harness::new();
	h.establish().await;

	let (tx, mut events) = mpsc::unbounded_channel();
	let pending = tokio::spawn({
		let session = h.session.clone();
		async move {
			session
				.subscribe(TOPIC, Dict::new(), move |event| {
					let _ = tx.send(event);
				})
				.await
		}
	});
	let request = request_id(&h.sent().await);
	pending.abort();
	assert!(pending.await.expect_err("subscribe task was aborted").is_cancelled());

	h.router.inject(&Message::Subscribed {
		request,
		subscription: 5,
	});
	let sent = h.sent().await;
	let unsubscribe = request_id(&sent);
	assert_eq!(
		sent,
		Message::Unsubscribe {
			request: unsubscribe,
			subscription: 5
		}
	);

	h.router.inject(&event(5, 1, Dict::new()));
	assert_eq!(h.notice().await, Notice::Anomaly(Anomaly::UnknownSubscription(5)));
	assert!(events.try_recv().is_err());

	// The router's confirmation is expected and not reported.
	h.router.inject(&Message::Unsubscribed { request: unsubscribe });
	h.router.inject(&event(6, 2, Dict::new()));
	assert_eq!(h.notice().await, Notice::Anomaly(Anomaly::UnknownSubscription(6)));
	assert!(format!("{:?}", h.session).contains("subscriptions: 0"));
}

#[tokio::test]
async fn event_for_unknown_subscription_is_an_anomaly() {
	let mut h = Harness::new();
	h.establish().await;

	h.router.inject(&event(404, 1, Dict::new()));

	assert_eq!(h.notice().await, Notice::Anomaly(Anomaly::UnknownSubscription(404)));
	assert!(h.session.is_connected());
}

#[tokio::test]
async fn subscribe_error_is_returned() {
	let mut h = Harness::new();
	h.establish().await;

	let pending = tokio::spawn({
		let session = h.session.clone();
		async move { session.subscribe("bad..topic", Dict::new(), |_| {}).await }
	});
	let request = request_id(&h.sent().await);
	h.router.inject(&Message::Error {
		request_type: MessageKind::Subscribe.code(),
		request,
		details: Dict::new(),
		error: "wamp.error.invalid_uri".to_string(),
		args: vec![],
		kwargs: Dict::new(),
	});

	let err = pending.await.expect("subscribe task").unwrap_err();
	assert_eq!(err.remote().map(|r| r.error.as_str()), Some("wamp.error.invalid_uri"));
}

#[tokio::test]
async fn lost_transport_deactivates_subscriptions() {
	let mut h = Harness::new();
	h.establish().await;
	let (subscription, _events) = subscribe(&h, 55).await;

	h.router.drop_connection("gone");
	assert!(matches!(h.notice().await, Notice::Ended(_)));
	assert!(!subscription.is_active());
	assert!(matches!(subscription.cancel().await, Err(Error::HandleInactive { .. })));
}

#[tokio::test]
async fn publish_is_fire_and_forget() {
	let mut h = Harness::new();
	h.establish().await;

	h.session
		.publish(TOPIC, Dict::new(), vec![json!("hello")], dict(json!({"n": 1})))
		.expect("publish");

	match h.sent().await {
		Message::Publish {
			options,
			topic,
			args,
			kwargs,
			..
		} => {
			assert!(options.is_empty());
			assert_eq!(topic, TOPIC);
			assert_eq!(args, vec![json!("hello")]);
			assert_eq!(kwargs.get("n"), Some(&json!(1)));
		}
		other => panic!("expected PUBLISH, got {other:?}"),
	}
}

#[tokio::test]
async fn acknowledged_publish_waits_for_published() {
	let mut h = Harness::new();
	h.establish().await;

	let publish = tokio::spawn({
		let session = h.session.clone();
		async move { session.publish_acknowledged(TOPIC, Dict::new(), vec![], Dict::new()).await }
	});
	let sent = h.sent().await;
	let request = request_id(&sent);
	match &sent {
		Message::Publish { options, .. } => assert_eq!(options.get("acknowledge"), Some(&json!(true))),
		other => panic!("expected PUBLISH, got {other:?}"),
	}

	h.router.inject(&Message::Published {
		request,
		publication: 5000,
	});
	publish.await.expect("publish task").expect("publish should be acknowledged");
}
