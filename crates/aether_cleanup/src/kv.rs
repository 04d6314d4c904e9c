//! Key-value cleanup orchestrator (spec §4.4 "KV").

use std::sync::Arc;

use aether_jobs::{JobManager, Module};
use aether_protocol::{DataCleanupResult, KvCleanupRequest};
use tracing::instrument;

use crate::drivers::{KvDriver, LiveKvDriver};
use crate::error::{CleanupError, Result};
use crate::target::{clean_target, ACTION_TIMEOUT};

/// Validates `patterns`, then re-applies the driver's `cleanup` once per
/// target pattern so progress is observable between patterns.
#[instrument(skip(jobs, req), fields(db = req.db, patterns = req.patterns.len()))]
pub async fn run_kv_cleanup(jobs: &JobManager, req: KvCleanupRequest) -> Result<DataCleanupResult> {
    run_with_driver(jobs, req, Arc::new(LiveKvDriver)).await
}

async fn run_with_driver(
    jobs: &JobManager,
    req: KvCleanupRequest,
    driver: Arc<dyn KvDriver>,
) -> Result<DataCleanupResult> {
    if req.patterns.is_empty() {
        return Err(CleanupError::Validation("patterns must not be empty".into()));
    }

    match req.job_id.clone() {
        Some(job_id) => {
            let conn = req.conn.clone();
            let db = req.db;
            let patterns = req.patterns.clone();
            let total = patterns.len() as i64;
            let snapshot = jobs
                .start(&job_id, Module::Kv, total, ACTION_TIMEOUT, move |handle| async move {
                    for raw in &patterns {
                        let pattern = clean_target(raw).map_err(|e| e.to_string())?;
                        handle.set_current(&pattern);
                        match driver.cleanup(&conn, db, std::slice::from_ref(&pattern)).await {
                            Ok(deleted) => handle.mark_item_done_with_deleted(deleted),
                            Err(failure) => {
                                // The pattern that failed may still have
                                // deleted some keys before the error; credit
                                // them before the job finalizes as failed
                                // (spec §4.2.2 step 4).
                                handle.add_deleted(failure.partial_deleted);
                                return Err(failure.message);
                            }
                        }
                    }
                    Ok(())
                })
                .await?;
            Ok(DataCleanupResult {
                deleted: snapshot.deleted,
                detail: Some(snapshot.to_detail_json()),
            })
        }
        None => {
            let total = tokio::time::timeout(ACTION_TIMEOUT, run_all(&req))
                .await
                .map_err(|_| CleanupError::Validation("cleanup timed out".into()))??;
            Ok(DataCleanupResult {
                deleted: total,
                detail: None,
            })
        }
    }
}

/// Synchronous (no `jobId`) path talks to the real driver directly, keeping
/// its typed error instead of the stringified form the job worker needs.
async fn run_all(req: &KvCleanupRequest) -> Result<i64> {
    let mut total = 0i64;
    for raw in &req.patterns {
        let pattern = clean_target(raw)?;
        total += aether_drivers::kv::cleanup(&req.conn, req.db, std::slice::from_ref(&pattern)).await?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_protocol::Connection;

    #[tokio::test]
    async fn rejects_empty_patterns_before_starting_a_job() {
        let jobs = JobManager::spawn();
        let req = KvCleanupRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 6379,
                ..Default::default()
            },
            db: 0,
            patterns: vec![],
            job_id: None,
        };
        assert!(matches!(
            run_kv_cleanup(&jobs, req).await,
            Err(CleanupError::Validation(_))
        ));
        jobs.shutdown().await;
    }

    #[tokio::test]
    async fn job_path_reuses_a_started_job_idempotently() {
        use crate::drivers::fakes::ScriptedDriver;
        use std::time::Duration;

        let jobs = JobManager::spawn();
        let req = KvCleanupRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 6379,
                ..Default::default()
            },
            db: 0,
            patterns: vec!["session:*".into(), "cache:*".into()],
            job_id: Some("job-kv-1".into()),
        };
        let driver = Arc::new(ScriptedDriver::new(vec![Ok(4), Ok(9)]));

        run_with_driver(&jobs, req.clone(), driver.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = jobs.snapshot("job-kv-1").unwrap();
        assert_eq!(snap.deleted, 13);

        // Restarting the same job id without new scripted outcomes must not
        // re-invoke the driver: the manager returns the cached snapshot.
        run_with_driver(&jobs, req, driver.clone()).await.unwrap();
        assert_eq!(driver.calls.lock().unwrap().len(), 2);
        jobs.shutdown().await;
    }

    #[tokio::test]
    async fn job_path_credits_partial_deleted_before_failing() {
        use crate::drivers::fakes::ScriptedKvDriver;
        use crate::drivers::KvCleanupFailure;
        use aether_protocol::JobStatus;
        use std::time::Duration;

        let jobs = JobManager::spawn();
        let req = KvCleanupRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 6379,
                ..Default::default()
            },
            db: 0,
            patterns: vec!["session:*".into(), "cache:*".into()],
            job_id: Some("job-kv-2".into()),
        };
        let driver = Arc::new(ScriptedKvDriver::new(vec![
            Ok(4),
            Err(KvCleanupFailure {
                partial_deleted: 7,
                message: "scan against 127.0.0.1:6379 (pattern \"cache:*\") failed: reset".into(),
            }),
        ]));

        run_with_driver(&jobs, req, driver).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = jobs.snapshot("job-kv-2").unwrap();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.done, 1);
        assert_eq!(snap.deleted, 11);
        jobs.shutdown().await;
    }
}
