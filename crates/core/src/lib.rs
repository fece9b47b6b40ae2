//! WAMP client sessions.
//!
//! This crate implements the client side of a WAMP session: joining a realm
//! (including challenge/response authentication), calling and registering
//! procedures, and publishing and subscribing to topics.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use wamp::{Dict, Session, SessionConfig, Yield};
//! use wamp_runtime::WebSocketTransport;
//!
//! let transport = Arc::new(WebSocketTransport::new("ws://127.0.0.1:8080/ws"));
//! let session = Session::new(SessionConfig::new("realm1"), transport);
//! tokio::spawn({
//!     let session = session.clone();
//!     async move { session.run().await }
//! });
//! session.connect(false)?;
//!
//! // once established:
//! let sum = session
//!     .call("org.test.add", Dict::new(), vec![json!(1), json!(1)], Dict::new())
//!     .await?;
//!
//! let registration = session
//!     .register("org.test.echo", Dict::new(), |invocation| Ok(Yield::with_args(invocation.args)))
//!     .await?;
//! ```
//!
//! Wire types live in [`wamp_protocol`], transports in [`wamp_runtime`].

mod anomaly;
mod config;
mod delegate;
mod error;
mod handle;
mod pending;
mod registration;
mod registry;
mod session;
mod subscription;
mod types;

pub use anomaly::Anomaly;
pub use config::{DEFAULT_AGENT, SessionConfig};
pub use delegate::SessionDelegate;
pub use error::{Error, HandleKind, RemoteError, Result};
pub use registration::{InvocationHandler, Registration};
pub use session::{Session, SessionStatus};
pub use subscription::{EventHandler, Subscription};
pub use types::{CallResult, Event, Invocation, InvocationError, Yield};
pub use wamp_protocol::{Dict, Id, List, Role, Value};
