//! Relational cleanup orchestrator (spec §4.4 "Relational").

use std::sync::Arc;

use aether_jobs::{JobManager, Module};
use aether_protocol::{DataCleanupResult, RelationalDeleteTablesRequest};
use tracing::instrument;

use crate::drivers::{LiveRelationalDriver, RelationalDriver};
use crate::error::{CleanupError, Result};
use crate::target::{clean_target, ACTION_TIMEOUT};

/// `database` must also be non-empty (spec §4.4 "Relational" specifics);
/// each target reuses the driver's `delete_tables` with a single-element
/// slice, so every table gets its own transaction.
#[instrument(skip(jobs, req), fields(database = %req.database, tables = req.tables.len()))]
pub async fn run_relational_cleanup(
    jobs: &JobManager,
    req: RelationalDeleteTablesRequest,
) -> Result<DataCleanupResult> {
    run_with_driver(jobs, req, Arc::new(LiveRelationalDriver)).await
}

async fn run_with_driver(
    jobs: &JobManager,
    req: RelationalDeleteTablesRequest,
    driver: Arc<dyn RelationalDriver>,
) -> Result<DataCleanupResult> {
    if req.database.trim().is_empty() {
        return Err(CleanupError::Validation("database must not be empty".into()));
    }
    if req.tables.is_empty() {
        return Err(CleanupError::Validation("tables must not be empty".into()));
    }

    match req.job_id.clone() {
        Some(job_id) => {
            let conn = req.conn.clone();
            let database = req.database.clone();
            let tables = req.tables.clone();
            let total = tables.len() as i64;
            let snapshot = jobs
                .start(&job_id, Module::Relational, total, ACTION_TIMEOUT, move |handle| async move {
                    for raw in &tables {
                        let table = clean_target(raw).map_err(|e| e.to_string())?;
                        handle.set_current(&table);
                        let deleted = driver
                            .delete_tables(&conn, &database, std::slice::from_ref(&table))
                            .await?;
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

/// The synchronous (no `jobId`) path talks to the real driver directly
/// rather than through the trait seam, so it keeps the driver's typed
/// error instead of the stringified form the job worker needs.
async fn run_all(req: &RelationalDeleteTablesRequest) -> Result<i64> {
    let mut total = 0i64;
    for raw in &req.tables {
        let table = clean_target(raw)?;
        total += aether_db::delete_tables(&req.conn, &req.database, std::slice::from_ref(&table)).await?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_protocol::Connection;

    fn base_req() -> RelationalDeleteTablesRequest {
        RelationalDeleteTablesRequest {
            conn: Connection {
                host: "127.0.0.1".into(),
                port: 3306,
                ..Default::default()
            },
            database: "d".into(),
            tables: vec!["t1".into()],
            job_id: None,
        }
    }

    #[tokio::test]
    async fn rejects_empty_database_before_starting_a_job() {
        let jobs = JobManager::spawn();
        let mut req = base_req();
        req.database = "  ".into();
        assert!(matches!(
            run_relational_cleanup(&jobs, req).await,
            Err(CleanupError::Validation(_))
        ));
        jobs.shutdown().await;
    }

    #[tokio::test]
    async fn rejects_empty_table_list() {
        let jobs = JobManager::spawn();
        let mut req = base_req();
        req.tables = vec![];
        assert!(matches!(
            run_relational_cleanup(&jobs, req).await,
            Err(CleanupError::Validation(_))
        ));
        jobs.shutdown().await;
    }

    #[tokio::test]
    async fn job_path_reports_progress_and_total_deleted() {
        use crate::drivers::fakes::ScriptedDriver;
        use std::time::Duration;

        let jobs = JobManager::spawn();
        let mut req = base_req();
        req.tables = vec!["t1".into(), "t2".into()];
        req.job_id = Some("job-rel-1".into());
        let driver = Arc::new(ScriptedDriver::new(vec![Ok(3), Ok(7)]));

        let started = run_with_driver(&jobs, req, driver.clone()).await.unwrap();
        assert!(started.detail.is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = jobs.snapshot("job-rel-1").unwrap();
        assert_eq!(snap.done, 2);
        assert_eq!(snap.deleted, 10);
        assert_eq!(*driver.calls.lock().unwrap(), vec!["t1".to_string(), "t2".to_string()]);
        jobs.shutdown().await;
    }
}
