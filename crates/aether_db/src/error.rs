use thiserror::Error;

/// Errors from the relational (MySQL-family) driver.
///
/// Every variant carries its own field bag (`addr`, `db`, `table`) so
/// callers can match on structure instead of parsing text.
#[derive(Debug, Error)]
pub enum RelationalError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("query against {addr}/{db} failed: {source}")]
    Query {
        addr: String,
        db: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("delete from {addr}/{db}.{table} failed: {source}")]
    Delete {
        addr: String,
        db: String,
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("commit against {addr}/{db} failed: {source}")]
    Commit {
        addr: String,
        db: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("operation against {addr} timed out")]
    Timeout { addr: String },
}

pub type Result<T> = std::result::Result<T, RelationalError>;
