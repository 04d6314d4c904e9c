use std::time::Duration;

use sqlx::Row;
use tracing::instrument;

use crate::error::{RelationalError, Result};
use crate::ident::quote_identifier;
use crate::pool::{addr, connect};
use aether_protocol::Connection as ConnSpec;

/// List timeout for read-only list operations (spec §4.2.1, §6).
pub const LIST_TIMEOUT: Duration = Duration::from_secs(20);
/// Action timeout for destructive cleanup operations (spec §3, §4.5).
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// `ListDatabases` (spec §4.2.1): connect with no database selected, run
/// `SHOW DATABASES`, drop empty names, sort.
#[instrument(skip(conn), fields(addr = %addr(conn)))]
pub async fn list_databases(conn: &ConnSpec) -> Result<Vec<String>> {
    let pool = connect(conn, "", LIST_TIMEOUT).await?;
    let rows = run_query(&pool, conn, "", "SHOW DATABASES").await?;
    pool.close().await;

    let mut names: Vec<String> = rows
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    Ok(names)
}

/// `ListTables` (spec §4.2.1): same shape, bound to `database`.
#[instrument(skip(conn), fields(addr = %addr(conn)))]
pub async fn list_tables(conn: &ConnSpec, database: &str) -> Result<Vec<String>> {
    if database.is_empty() {
        return Err(RelationalError::Validation(
            "database must not be empty".into(),
        ));
    }
    let pool = connect(conn, database, LIST_TIMEOUT).await?;
    let rows = run_query(&pool, conn, database, "SHOW TABLES").await?;
    pool.close().await;

    let mut names: Vec<String> = rows
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    Ok(names)
}

async fn run_query(
    pool: &sqlx::MySqlPool,
    conn: &ConnSpec,
    database: &str,
    sql: &str,
) -> Result<Vec<String>> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|source| RelationalError::Query {
            addr: addr(conn),
            db: database.to_string(),
            source,
        })?;
    Ok(rows
        .into_iter()
        .map(|row| row.try_get::<String, _>(0).unwrap_or_default())
        .collect())
}

/// `DeleteTables` (spec §4.2.1): transactional multi-table truncate-by-delete.
///
/// Each table is deleted in request order inside a single transaction with
/// referential-integrity checks disabled for the session; any failure rolls
/// the whole transaction back and the partial row count is not reported
/// (spec §4.2.1 step 3; §7 "Remote execution failure").
#[instrument(skip(conn), fields(addr = %addr(conn), db = %database))]
pub async fn delete_tables(conn: &ConnSpec, database: &str, tables: &[String]) -> Result<i64> {
    if database.is_empty() {
        return Err(RelationalError::Validation(
            "database must not be empty".into(),
        ));
    }
    if tables.is_empty() {
        return Err(RelationalError::Validation(
            "tables must not be empty".into(),
        ));
    }

    let quoted: Vec<String> = tables
        .iter()
        .map(|t| quote_identifier(t))
        .collect::<Result<Vec<_>>>()?;

    let pool = connect(conn, database, ACTION_TIMEOUT).await?;
    let result = delete_all(&pool, conn, database, tables, &quoted).await;
    pool.close().await;
    result
}

async fn delete_all(
    pool: &sqlx::MySqlPool,
    conn: &ConnSpec,
    database: &str,
    tables: &[String],
    quoted: &[String],
) -> Result<i64> {
    let addr = addr(conn);
    let mut tx = pool
        .begin()
        .await
        .map_err(|source| RelationalError::Query {
            addr: addr.clone(),
            db: database.to_string(),
            source,
        })?;

    sqlx::query("SET FOREIGN_KEY_CHECKS=0")
        .execute(&mut *tx)
        .await
        .map_err(|source| RelationalError::Query {
            addr: addr.clone(),
            db: database.to_string(),
            source,
        })?;

    let mut total: i64 = 0;
    for (table, quoted_ident) in tables.iter().zip(quoted) {
        let stmt = format!("DELETE FROM {quoted_ident}");
        match sqlx::query(&stmt).execute(&mut *tx).await {
            Ok(outcome) => total += outcome.rows_affected() as i64,
            Err(source) => {
                let _ = tx.rollback().await;
                return Err(RelationalError::Delete {
                    addr,
                    db: database.to_string(),
                    table: table.clone(),
                    source,
                });
            }
        }
    }

    tx.commit()
        .await
        .map_err(|source| RelationalError::Commit {
            addr,
            db: database.to_string(),
            source,
        })?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_tables_rejects_empty_database_before_connecting() {
        // Validation happens before any connection is opened (spec §8
        // boundary behavior: "Empty ... -> validation error, no connection
        // opened").
        let conn = ConnSpec {
            host: "127.0.0.1".into(),
            port: 3306,
            ..Default::default()
        };
        assert!(matches!(
            list_tables(&conn, "").await,
            Err(RelationalError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn delete_tables_rejects_empty_table_list_before_connecting() {
        let conn = ConnSpec {
            host: "127.0.0.1".into(),
            port: 3306,
            ..Default::default()
        };
        assert!(matches!(
            delete_tables(&conn, "d", &[]).await,
            Err(RelationalError::Validation(_))
        ));
    }
}
