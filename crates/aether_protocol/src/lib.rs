//! Wire envelope, action codes, and the binary codec for the Aether agent
//! data-cleanup RPCs (spec §3, §4.1, §6).
//!
//! Decoding is deliberately a two-step process: [`Envelope::decode`] peels
//! off the action code and request id, then each per-action request type in
//! [`requests`] decodes the opaque payload bytes into a typed struct over
//! the self-describing [`value::Value`] tree.

pub mod action;
pub mod envelope;
pub mod error;
pub mod requests;
pub mod snapshot;
pub mod value;

pub use action::Action;
pub use envelope::Envelope;
pub use error::{ProtocolError, Result};
pub use requests::{
    ConnOnlyRequest, Connection, DataCleanupResult, JobStatusRequest, KvCleanupRequest,
    ObjectStoreCleanupRequest, ObjectStoreListPrefixesRequest, RelationalDeleteTablesRequest,
    RelationalListTablesRequest, SearchCleanupRequest,
};
pub use snapshot::{JobStatus, Module, Snapshot};
pub use value::Value;
