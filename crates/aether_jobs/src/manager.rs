use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use aether_protocol::snapshot::{Module, Snapshot};

use crate::error::{JobError, Result};
use crate::job::JobHandle;

/// How long a terminal job's snapshot remains visible (spec §4.3 state
/// machine, `expiresAt = now + TTL`).
pub const JOB_TTL: Duration = Duration::from_secs(60 * 60);
/// Reaper sweep period (spec §4.3 "Reaper").
pub const REAPER_INTERVAL: Duration = Duration::from_secs(5 * 60);

type JobMap = HashMap<String, Arc<JobHandle>>;

/// In-memory job registry plus background reaper (spec §4.3).
///
/// The manager-level lock only ever guards the job map itself; it is
/// released before a worker's `run` future is polled, so a long-running
/// cleanup never blocks `Start`/`Snapshot` calls for other jobs.
pub struct JobManager {
    jobs: Arc<Mutex<JobMap>>,
    reaper_shutdown: Arc<Notify>,
    reaper_handle: Mutex<Option<JoinHandle<()>>>,
}

impl JobManager {
    /// Construct a manager and spawn its background reaper task.
    pub fn spawn() -> Arc<Self> {
        let manager = Arc::new(Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            reaper_shutdown: Arc::new(Notify::new()),
            reaper_handle: Mutex::new(None),
        });

        let jobs = manager.jobs.clone();
        let shutdown = manager.reaper_shutdown.clone();
        let handle = tokio::spawn(reaper_loop(jobs, shutdown));
        *manager.reaper_handle.lock().expect("reaper mutex poisoned") = Some(handle);
        manager
    }

    /// Signal the reaper to stop and wait for it to exit.
    pub async fn shutdown(&self) {
        self.reaper_shutdown.notify_one();
        let handle = self.reaper_handle.lock().expect("reaper mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// `Start` (spec §4.3): idempotent job creation.
    ///
    /// `run` receives the job's own [`JobHandle`] so it can report progress,
    /// and is bounded by `timeout` via [`tokio::time::timeout`]; the
    /// timeout firing is treated the same as `run` returning an error, per
    /// spec §5 "the driver's next syscall returns a cancellation error".
    #[instrument(skip(self, run), fields(job_id = %job_id))]
    pub async fn start<F, Fut>(
        &self,
        job_id: &str,
        module: Module,
        total: i64,
        timeout: Duration,
        run: F,
    ) -> Result<Snapshot>
    where
        F: FnOnce(Arc<JobHandle>) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), String>> + Send + 'static,
    {
        if job_id.is_empty() {
            return Err(JobError::Validation("jobId must not be empty".into()));
        }
        if total < 0 {
            return Err(JobError::Validation("total must be >= 0".into()));
        }

        if let Some(existing) = self.live_job(job_id) {
            debug!("job already running, returning existing snapshot");
            return Ok(existing.snapshot());
        }

        let handle = {
            let mut jobs = self.jobs.lock().expect("job map mutex poisoned");
            if let Some(existing) = jobs.get(job_id) {
                if !(existing.is_terminal() && existing.is_expired(Instant::now())) {
                    return Ok(existing.snapshot());
                }
            }
            let handle = Arc::new(JobHandle::new(job_id.to_string(), module, total));
            jobs.insert(job_id.to_string(), handle.clone());
            handle
        };

        let worker_handle = handle.clone();
        let cancel = handle.cancel.clone();
        tokio::spawn(async move {
            let outcome = tokio::time::timeout(timeout, run(worker_handle.clone())).await;
            let result = match outcome {
                Ok(result) => result,
                Err(_) => Err(format!("job timed out after {timeout:?}")),
            };
            cancel.cancel();
            worker_handle.finalize(result, JOB_TTL);
        });

        Ok(handle.snapshot())
    }

    fn live_job(&self, job_id: &str) -> Option<Arc<JobHandle>> {
        let jobs = self.jobs.lock().expect("job map mutex poisoned");
        jobs.get(job_id)
            .filter(|j| !(j.is_terminal() && j.is_expired(Instant::now())))
            .cloned()
    }

    /// `Snapshot` (spec §4.3): lazy-evicts an expired terminal job.
    pub fn snapshot(&self, job_id: &str) -> Option<Snapshot> {
        let mut jobs = self.jobs.lock().expect("job map mutex poisoned");
        let job = jobs.get(job_id)?;
        if job.is_terminal() && job.is_expired(Instant::now()) {
            jobs.remove(job_id);
            return None;
        }
        Some(job.snapshot())
    }
}

async fn reaper_loop(jobs: Arc<Mutex<JobMap>>, shutdown: Arc<Notify>) {
    let mut ticker = tokio::time::interval(REAPER_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => {
                info!("job reaper shutting down");
                break;
            }
            _ = ticker.tick() => {
                reap_once(&jobs);
            }
        }
    }
}

fn reap_once(jobs: &Arc<Mutex<JobMap>>) {
    let now = Instant::now();
    let mut jobs = jobs.lock().expect("job map mutex poisoned");
    let before = jobs.len();
    jobs.retain(|_, job| !(job.is_terminal() && job.is_expired(now)));
    let reaped = before - jobs.len();
    if reaped > 0 {
        warn!(reaped, "reaped expired jobs");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_rejects_empty_job_id() {
        let manager = JobManager::spawn();
        let result = manager
            .start("", Module::Kv, 1, Duration::from_secs(1), |_| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(JobError::Validation(_))));
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn start_is_idempotent_for_a_running_job() {
        let manager = JobManager::spawn();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let rx = std::sync::Mutex::new(Some(rx));

        let first = manager
            .start("J1", Module::Kv, 3, Duration::from_secs(5), move |_handle| {
                let rx = rx.lock().unwrap().take().unwrap();
                async move {
                    let _ = rx.await;
                    Ok(())
                }
            })
            .await
            .unwrap();
        assert_eq!(first.total, 3);

        let second = manager
            .start("J1", Module::Kv, 99, Duration::from_secs(5), |_| async { Ok(()) })
            .await
            .unwrap();
        // Idempotent: the second Start's arguments are ignored.
        assert_eq!(second.total, 3);

        let _ = tx.send(());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn snapshot_reports_progress_and_completion() {
        let manager = JobManager::spawn();
        manager
            .start("J2", Module::Relational, 2, Duration::from_secs(5), |handle| async move {
                handle.set_current("t1");
                handle.mark_item_done_with_deleted(4);
                handle.set_current("t2");
                handle.mark_item_done_with_deleted(6);
                Ok(())
            })
            .await
            .unwrap();

        // Give the spawned worker a chance to run to completion.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snap = manager.snapshot("J2").unwrap();
        assert_eq!(snap.done, 2);
        assert_eq!(snap.deleted, 10);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn snapshot_is_none_for_unknown_job() {
        let manager = JobManager::spawn();
        assert!(manager.snapshot("missing").is_none());
        manager.shutdown().await;
    }
}
