//! Relational (MySQL-family) cleanup driver (spec §4.2.1).
//!
//! Every call opens a short-lived connection scoped to itself (spec §5
//! "External connections are never pooled across requests") and closes it
//! on every return path, including errors.

pub mod driver;
pub mod error;
mod ident;
mod pool;

pub use driver::{delete_tables, list_databases, list_tables, ACTION_TIMEOUT, LIST_TIMEOUT};
pub use error::{RelationalError, Result};
pub use ident::quote_identifier;
