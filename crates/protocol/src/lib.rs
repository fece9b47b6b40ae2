//! Wire types for the WAMP protocol.
//!
//! This crate contains the message taxonomy exchanged between a WAMP peer and
//! its router, the codec that maps each message to and from the positional
//! array the serializer works with, and the serializer contract itself.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond encoding/decoding
//! * 1:1 with protocol: Discriminants and field order match the WAMP basic
//!   profile (plus challenge/authenticate from the advanced profile)
//! * Checked: Decoding a payload from a peer never panics
//!
//! Session semantics are built on top of these types in `wamp-rs`.

pub mod codec;
pub mod kind;
pub mod message;
pub mod role;
pub mod serializer;
pub mod uri;
pub mod value;

pub use codec::{DecodeError, decode};
pub use kind::MessageKind;
pub use message::Message;
pub use role::Role;
pub use serializer::{JsonSerializer, Serializer, SerializerError};
pub use value::{Dict, Id, List, MAX_ID, Value};
