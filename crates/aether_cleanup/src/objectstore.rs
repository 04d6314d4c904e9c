//! Object-store cleanup orchestrator (spec §4.4 "Object-store").

use std::sync::Arc;

use aether_jobs::{JobManager, Module};
use aether_protocol::{DataCleanupResult, ObjectStoreCleanupRequest};
use tracing::instrument;

use crate::drivers::{LiveObjectStoreDriver, ObjectStoreDriver};
use crate::error::{CleanupError, Result};
use crate::target::{clean_target, ACTION_TIMEOUT};

/// The store client is implicit per call to the driver; per-batch progress
/// is credited via the driver's `on_batch` callback, so the orchestrator
/// only marks the target done once the prefix finishes (spec §4.4 "do not
/// double-count").
#[instrument(skip(jobs, req), fields(bucket = %req.bucket, prefixes = req.prefixes.len()))]
pub async fn run_objectstore_cleanup(
    jobs: &JobManager,
    req: ObjectStoreCleanupRequest,
) -> Result<DataCleanupResult> {
    run_with_driver(jobs, req, Arc::new(LiveObjectStoreDriver)).await
}

async fn run_with_driver(
    jobs: &JobManager,
    req: ObjectStoreCleanupRequest,
    driver: Arc<dyn ObjectStoreDriver>,
) -> Result<DataCleanupResult> {
    if req.prefixes.is_empty() {
        return Err(CleanupError::Validation("prefixes must not be empty".into()));
    }

    match req.job_id.clone() {
        Some(job_id) => {
            let conn = req.conn.clone();
            let bucket = req.bucket.clone();
            let prefixes = req.prefixes.clone();
            let total = prefixes.len() as i64;
            let snapshot = jobs
                .start(&job_id, Module::ObjectStore, total, ACTION_TIMEOUT, move |handle| async move {
                    for raw in &prefixes {
                        let prefix = clean_target(raw).map_err(|e| e.to_string())?;
                        handle.set_current(&prefix);
                        let progress_handle = handle.clone();
                        let mut on_batch = move |delta: i64| progress_handle.add_deleted(delta);
                        driver
                            .cleanup_prefix(&conn, &bucket, &prefix, &mut on_batch)
                            .await?;
                        handle.mark_item_done();
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
async fn run_all(req: &ObjectStoreCleanupRequest) -> Result<i64> {
    let mut total = 0i64;
    for raw in &req.prefixes {
        let prefix = clean_target(raw)?;
        total += aether_drivers::objectstore::cleanup_prefix(&req.conn, &req.bucket, &prefix, None)
            .await?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_protocol::Connection;

    #[tokio::test]
    async fn rejects_empty_prefixes_before_starting_a_job() {
        let jobs = JobManager::spawn();
        let req = ObjectStoreCleanupRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 9000,
                ..Default::default()
            },
            bucket: "b".into(),
            prefixes: vec![],
            job_id: None,
        };
        assert!(matches!(
            run_objectstore_cleanup(&jobs, req).await,
            Err(CleanupError::Validation(_))
        ));
        jobs.shutdown().await;
    }

    #[tokio::test]
    async fn job_path_accumulates_progress_across_batch_boundaries() {
        use crate::drivers::fakes::ScriptedObjectStoreDriver;
        use std::time::Duration;

        let jobs = JobManager::spawn();
        let req = ObjectStoreCleanupRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 9000,
                ..Default::default()
            },
            bucket: "b".into(),
            prefixes: vec!["logs/".into()],
            job_id: Some("job-os-1".into()),
        };
        // Three batches inside a single prefix: 5000, 5000, 2001, crossing the
        // 5000/10000 callback boundaries before the final partial batch.
        let driver = Arc::new(ScriptedObjectStoreDriver::new(vec![vec![5000, 5000, 2001]]));

        run_with_driver(&jobs, req, driver).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = jobs.snapshot("job-os-1").unwrap();
        assert_eq!(snap.done, 1);
        assert_eq!(snap.deleted, 12001);
        jobs.shutdown().await;
    }
}
