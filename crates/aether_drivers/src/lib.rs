//! Key-value, object-store, and search cleanup drivers (spec §4.2.2–4.2.4).
//!
//! Each module owns its backend's connection lifecycle; like
//! [`aether_db`](../aether_db/index.html), nothing is pooled across
//! requests.

pub mod error;
pub mod kv;
pub mod objectstore;
pub mod search;

pub use error::{KvError, ObjectStoreError, SearchError};
