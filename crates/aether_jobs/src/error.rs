use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid job: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, JobError>;
