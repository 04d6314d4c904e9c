use thiserror::Error;

/// Errors surfaced verbatim to the transport's native error channel (spec
/// §4.5, §7 "the handler registry surfaces errors verbatim to the
/// transport").
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("hub not verified")]
    HubNotVerified,

    #[error("unknown action: {0}")]
    UnknownAction(u8),

    #[error("action timed out")]
    Timeout,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error(transparent)]
    Protocol(#[from] aether_protocol::ProtocolError),

    #[error(transparent)]
    Relational(#[from] aether_db::RelationalError),

    #[error(transparent)]
    Kv(#[from] aether_drivers::KvError),

    #[error(transparent)]
    ObjectStore(#[from] aether_drivers::ObjectStoreError),

    #[error(transparent)]
    Search(#[from] aether_drivers::SearchError),

    #[error(transparent)]
    Cleanup(#[from] aether_cleanup::CleanupError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
