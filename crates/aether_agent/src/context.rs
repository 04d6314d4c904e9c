use std::sync::Arc;

use aether_jobs::JobManager;

/// Transport-agnostic callback for delivering a successful response (spec
/// §4.5 "the handler is responsible for invoking `SendResponse`").
///
/// Failures never go through this path; the registry propagates them to the
/// caller instead, which hands them to the transport's own error channel.
pub trait SendResponse: Send + Sync {
    fn send(&self, payload: Vec<u8>, request_id: Option<u32>);
}

/// Per-request state a handler needs: the shared job manager and whether
/// the calling Hub has completed the fingerprint-challenge handshake (spec
/// §4.5 "require `HubVerified = true`").
pub struct HandlerContext {
    pub jobs: Arc<JobManager>,
    pub hub_verified: bool,
}

impl HandlerContext {
    pub fn new(jobs: Arc<JobManager>, hub_verified: bool) -> Self {
        Self { jobs, hub_verified }
    }
}
