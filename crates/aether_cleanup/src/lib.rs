//! One orchestrator per backend, wiring decoded requests, drivers, and the
//! job manager together (spec §4.4).
//!
//! Every orchestrator shares the same skeleton: validate the target list,
//! then either hand it to [`aether_jobs::JobManager::start`] when a job id
//! is present, or run it synchronously under the same action timeout when
//! it isn't.

pub mod drivers;
mod error;
mod kv;
mod objectstore;
mod relational;
mod search;
mod target;

pub use error::{CleanupError, Result};
pub use kv::run_kv_cleanup;
pub use objectstore::run_objectstore_cleanup;
pub use relational::run_relational_cleanup;
pub use search::run_search_cleanup;
pub use target::ACTION_TIMEOUT;
