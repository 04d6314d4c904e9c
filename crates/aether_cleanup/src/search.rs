//! Search cleanup orchestrator (spec §4.4 "Search").

use std::sync::Arc;

use aether_jobs::{JobManager, Module};
use aether_protocol::{DataCleanupResult, SearchCleanupRequest};
use tracing::instrument;

use crate::drivers::{LiveSearchDriver, SearchDriver};
use crate::error::{CleanupError, Result};
use crate::target::{clean_target, ACTION_TIMEOUT};

/// Validates `indices`, then runs one delete-by-query per index.
#[instrument(skip(jobs, req), fields(indices = req.indices.len()))]
pub async fn run_search_cleanup(
    jobs: &JobManager,
    req: SearchCleanupRequest,
) -> Result<DataCleanupResult> {
    run_with_driver(jobs, req, Arc::new(LiveSearchDriver)).await
}

async fn run_with_driver(
    jobs: &JobManager,
    req: SearchCleanupRequest,
    driver: Arc<dyn SearchDriver>,
) -> Result<DataCleanupResult> {
    if req.indices.is_empty() {
        return Err(CleanupError::Validation("indices must not be empty".into()));
    }

    match req.job_id.clone() {
        Some(job_id) => {
            let conn = req.conn.clone();
            let indices = req.indices.clone();
            let total = indices.len() as i64;
            let snapshot = jobs
                .start(&job_id, Module::Search, total, ACTION_TIMEOUT, move |handle| async move {
                    for raw in &indices {
                        let index = clean_target(raw).map_err(|e| e.to_string())?;
                        handle.set_current(&index);
                        let deleted = driver.delete_index(&conn, &index).await?;
                        handle.mark_item_done_with_deleted(deleted);
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
async fn run_all(req: &SearchCleanupRequest) -> Result<i64> {
    let mut total = 0i64;
    for raw in &req.indices {
        let index = clean_target(raw)?;
        total += aether_drivers::search::delete_index(&req.conn, &index).await?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_protocol::Connection;

    #[tokio::test]
    async fn rejects_empty_indices_before_starting_a_job() {
        let jobs = JobManager::spawn();
        let req = SearchCleanupRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 9200,
                ..Default::default()
            },
            indices: vec![],
            job_id: None,
        };
        assert!(matches!(
            run_search_cleanup(&jobs, req).await,
            Err(CleanupError::Validation(_))
        ));
        jobs.shutdown().await;
    }

    #[tokio::test]
    async fn job_path_stops_at_the_first_failing_index() {
        use aether_protocol::JobStatus;
        use crate::drivers::fakes::ScriptedDriver;
        use std::time::Duration;

        let jobs = JobManager::spawn();
        let req = SearchCleanupRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 9200,
                ..Default::default()
            },
            indices: vec!["i1".into(), "i2".into(), "i3".into()],
            job_id: Some("job-search-1".into()),
        };
        let driver = Arc::new(ScriptedDriver::new(vec![
            Ok(10),
            Err("delete_index i2 failed: version_conflict_engine_exception".into()),
        ]));

        run_with_driver(&jobs, req, driver.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = jobs.snapshot("job-search-1").unwrap();

        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.done, 1);
        assert_eq!(snap.deleted, 10);
        assert!(snap.error.contains("version_conflict"));
        assert_eq!(*driver.calls.lock().unwrap(), vec!["i1".to_string(), "i2".to_string()]);
        jobs.shutdown().await;
    }
}
