use std::sync::Mutex;
use std::time::Instant;

use aether_protocol::snapshot::{JobStatus, Module, Snapshot};

use crate::cancel::CancellationToken;

struct JobFields {
    status: JobStatus,
    current: String,
    done: i64,
    total: i64,
    deleted: i64,
    seq: u64,
    error: String,
    updated_at: Instant,
    expires_at: Option<Instant>,
}

/// A single job's shared, mutable record (spec §4.3).
///
/// Field mutations serialize through this struct's own mutex so a
/// concurrent [`JobManager::snapshot`](crate::JobManager::snapshot) always
/// observes a consistent tuple (spec §4.3 "Concurrency guarantees").
pub struct JobHandle {
    pub job_id: String,
    pub module: Module,
    pub cancel: CancellationToken,
    fields: Mutex<JobFields>,
}

impl JobHandle {
    pub(crate) fn new(job_id: String, module: Module, total: i64) -> Self {
        Self {
            job_id,
            module,
            cancel: CancellationToken::new(),
            fields: Mutex::new(JobFields {
                status: JobStatus::Running,
                current: String::new(),
                done: 0,
                total,
                deleted: 0,
                seq: 0,
                error: String::new(),
                updated_at: Instant::now(),
                expires_at: None,
            }),
        }
    }

    /// `SetCurrent` (spec §4.3): set `current`, bump `seq`, refresh `updatedAt`.
    pub fn set_current(&self, label: impl Into<String>) {
        let mut f = self.fields.lock().expect("job mutex poisoned");
        f.current = label.into();
        f.seq += 1;
        f.updated_at = Instant::now();
    }

    /// `AddDeleted` (spec §4.3): only bumps `seq` when `delta` is positive.
    pub fn add_deleted(&self, delta: i64) {
        if delta <= 0 {
            return;
        }
        let mut f = self.fields.lock().expect("job mutex poisoned");
        f.deleted += delta;
        f.seq += 1;
        f.updated_at = Instant::now();
    }

    /// `MarkItemDone` (spec §4.3).
    pub fn mark_item_done(&self) {
        let mut f = self.fields.lock().expect("job mutex poisoned");
        f.done += 1;
        f.seq += 1;
        f.updated_at = Instant::now();
    }

    /// `MarkItemDoneWithDeleted` (spec §4.3): `done` and `deleted` move
    /// together under a single `seq` bump.
    pub fn mark_item_done_with_deleted(&self, delta: i64) {
        let mut f = self.fields.lock().expect("job mutex poisoned");
        f.done += 1;
        if delta > 0 {
            f.deleted += delta;
        }
        f.seq += 1;
        f.updated_at = Instant::now();
    }

    pub(crate) fn finalize(&self, result: std::result::Result<(), String>, ttl: std::time::Duration) {
        let mut f = self.fields.lock().expect("job mutex poisoned");
        match result {
            Ok(()) => f.status = JobStatus::Success,
            Err(err) => {
                f.status = JobStatus::Failed;
                f.error = err;
            }
        }
        f.seq += 1;
        f.updated_at = Instant::now();
        f.expires_at = Some(Instant::now() + ttl);
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        let f = self.fields.lock().expect("job mutex poisoned");
        matches!(f.expires_at, Some(expiry) if now >= expiry)
    }

    pub(crate) fn is_terminal(&self) -> bool {
        let f = self.fields.lock().expect("job mutex poisoned");
        f.status.is_terminal()
    }

    pub fn snapshot(&self) -> Snapshot {
        let f = self.fields.lock().expect("job mutex poisoned");
        Snapshot {
            job_id: self.job_id.clone(),
            module: self.module,
            status: f.status,
            current: f.current.clone(),
            done: f.done,
            total: f.total,
            deleted: f.deleted,
            seq: f.seq,
            error: f.error.clone(),
        }
    }
}
