use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Relational(#[from] aether_db::RelationalError),

    #[error(transparent)]
    Kv(#[from] aether_drivers::KvError),

    #[error(transparent)]
    ObjectStore(#[from] aether_drivers::ObjectStoreError),

    #[error(transparent)]
    Search(#[from] aether_drivers::SearchError),

    #[error(transparent)]
    Job(#[from] aether_jobs::JobError),
}

pub type Result<T> = std::result::Result<T, CleanupError>;
