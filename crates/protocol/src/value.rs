//! Dynamic payload values.
//!
//! WAMP payloads are heterogeneous: options and details are string-keyed
//! dictionaries, arguments are positional lists of anything. We use
//! `serde_json::Value` as the tagged value type so every serializer boundary
//! speaks the same model.

pub use serde_json::Value;

/// Positional argument list (`args`, `results`).
pub type List = Vec<Value>;

/// Keyword dictionary (`options`, `details`, `kwargs`).
pub type Dict = serde_json::Map<String, Value>;

/// Request, session, subscription, registration and publication ids.
pub type Id = u64;

/// Largest id a peer may issue (2^53, so ids survive IEEE doubles).
pub const MAX_ID: Id = 1 << 53;
