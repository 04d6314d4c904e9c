use thiserror::Error;

/// Key-value (Redis) driver errors (spec §4.2.2).
#[derive(Debug, Error)]
pub enum KvError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("unexpected response shape for CONFIG GET databases: {0}")]
    ConfigShape(String),

    #[error("scan against {addr} (pattern {pattern:?}) failed: {source}")]
    Scan {
        addr: String,
        pattern: String,
        partial_deleted: i64,
        #[source]
        source: redis::RedisError,
    },

    #[error("delete against {addr} (pattern {pattern:?}) failed: {source}")]
    Delete {
        addr: String,
        pattern: String,
        partial_deleted: i64,
        #[source]
        source: redis::RedisError,
    },
}

impl KvError {
    /// Keys already deleted before this error cut the scan short (spec
    /// §4.2.2 step 4: "return the partial count alongside the error").
    pub fn partial_deleted(&self) -> i64 {
        match self {
            KvError::Scan { partial_deleted, .. } | KvError::Delete { partial_deleted, .. } => {
                *partial_deleted
            }
            _ => 0,
        }
    }

    pub(crate) fn add_partial_deleted(&mut self, extra: i64) {
        if let KvError::Scan { partial_deleted, .. } | KvError::Delete { partial_deleted, .. } =
            self
        {
            *partial_deleted += extra;
        }
    }
}

pub type Result<T> = std::result::Result<T, KvError>;

/// Object-store (S3/MinIO) driver errors (spec §4.2.3).
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("list failed for {bucket}/{prefix}: {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },

    #[error("remove failed for {bucket}/{prefix}: {message}")]
    Remove {
        bucket: String,
        prefix: String,
        message: String,
    },
}

pub type ObjectStoreResult<T> = std::result::Result<T, ObjectStoreError>;

/// Search (Elasticsearch) driver errors (spec §4.2.4).
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("host must not contain a scheme: {0}")]
    HostHasScheme(String),

    #[error("http request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("{url} returned a malformed response: {message}")]
    Decode { url: String, message: String },

    #[error("delete-by-query against {index} reported failures: {message}")]
    DeleteFailures { index: String, message: String },
}

pub type SearchResult<T> = std::result::Result<T, SearchError>;
