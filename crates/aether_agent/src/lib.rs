//! Handler registry for the Aether agent's data-cleanup subsystem (spec §4.5).
//!
//! Transport-agnostic by design: the registry is driven by whatever reads
//! framed `{Action, Data, RequestID}` envelopes off the wire (spec §6) and
//! owns a [`SendResponse`] implementation for delivering results back. This
//! crate owns no process, socket, or CLI surface (spec §1 Out-of-scope).

mod context;
mod error;
mod handlers;
mod registry;

pub use context::{HandlerContext, SendResponse};
pub use error::{AgentError, Result};
pub use handlers::LIST_TIMEOUT;
pub use registry::Registry;
