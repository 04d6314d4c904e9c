//! Async job manager for cleanup operations that run in the background
//! (spec §4.3).
//!
//! A [`JobManager`] owns the job map; each [`JobHandle`] owns its own
//! progress fields behind its own mutex, so a `Snapshot` call never blocks
//! on a running worker's progress updates beyond the span of a single
//! mutation.

mod cancel;
mod error;
mod job;
mod manager;

pub use aether_protocol::snapshot::{JobStatus, Module, Snapshot};
pub use cancel::CancellationToken;
pub use error::{JobError, Result};
pub use job::JobHandle;
pub use manager::{JobManager, JOB_TTL, REAPER_INTERVAL};
