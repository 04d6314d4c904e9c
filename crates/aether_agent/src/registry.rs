use std::collections::HashMap;

use aether_protocol::{Action, Envelope};

use crate::context::{HandlerContext, SendResponse};
use crate::error::{AgentError, Result};
use crate::handlers::{
    Handler, JobStatus, KvCleanup, KvListDatabases, ObjectStoreCleanup, ObjectStoreListBuckets,
    ObjectStoreListPrefixes, RelationalDeleteTables, RelationalListDatabases, RelationalListTables,
    SearchCleanup, SearchListIndices,
};

/// Action-keyed dispatch table (spec §4.5).
///
/// Stateless apart from the map; one registry per Agent process.
pub struct Registry {
    handlers: HashMap<Action, Box<dyn Handler>>,
}

impl Registry {
    pub fn new() -> Self {
        let mut handlers: HashMap<Action, Box<dyn Handler>> = HashMap::new();
        handlers.insert(Action::RelationalListDatabases, Box::new(RelationalListDatabases));
        handlers.insert(Action::RelationalListTables, Box::new(RelationalListTables));
        handlers.insert(Action::RelationalDeleteTables, Box::new(RelationalDeleteTables));
        handlers.insert(Action::KvListDatabases, Box::new(KvListDatabases));
        handlers.insert(Action::KvCleanup, Box::new(KvCleanup));
        handlers.insert(Action::ObjectStoreListBuckets, Box::new(ObjectStoreListBuckets));
        handlers.insert(Action::ObjectStoreListPrefixes, Box::new(ObjectStoreListPrefixes));
        handlers.insert(Action::ObjectStoreCleanup, Box::new(ObjectStoreCleanup));
        handlers.insert(Action::SearchListIndices, Box::new(SearchListIndices));
        handlers.insert(Action::SearchCleanup, Box::new(SearchCleanup));
        handlers.insert(Action::JobStatus, Box::new(JobStatus));
        Self { handlers }
    }

    /// Decode the raw `{Action, Data, RequestID}` envelope (spec §3, §6, C1)
    /// and dispatch it. Every action in this fixed set requires
    /// `ctx.hub_verified` (spec §4.5; this action set carries no
    /// fingerprint-challenge bootstrap action to exempt, see DESIGN.md).
    ///
    /// On success the handler itself has already called
    /// `responder.send(...)`; on failure nothing is sent and the error
    /// propagates to the caller, which is responsible for surfacing it on
    /// the transport's native error channel (spec §7).
    pub async fn dispatch(
        &self,
        ctx: &HandlerContext,
        action_code: u8,
        data: Vec<u8>,
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let envelope = Envelope::decode(action_code, data, request_id)
            .map_err(|_| AgentError::UnknownAction(action_code))?;

        if !ctx.hub_verified {
            return Err(AgentError::HubNotVerified);
        }

        let handler = self
            .handlers
            .get(&envelope.action)
            .ok_or(AgentError::UnknownAction(action_code))?;
        handler
            .handle(ctx, &envelope.data, envelope.request_id, responder)
            .await
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingResponder {
        sent: Mutex<Vec<(Vec<u8>, Option<u32>)>>,
    }

    impl SendResponse for RecordingResponder {
        fn send(&self, payload: Vec<u8>, request_id: Option<u32>) {
            self.sent.lock().unwrap().push((payload, request_id));
        }
    }

    #[tokio::test]
    async fn rejects_unverified_hub() {
        let registry = Registry::new();
        let ctx = HandlerContext::new(aether_jobs::JobManager::spawn(), false);
        let responder = RecordingResponder {
            sent: Mutex::new(vec![]),
        };
        let result = registry
            .dispatch(&ctx, Action::JobStatus.as_u8(), vec![], None, &responder)
            .await;
        assert!(matches!(result, Err(AgentError::HubNotVerified)));
        ctx.jobs.shutdown().await;
    }

    #[tokio::test]
    async fn rejects_unknown_action_code() {
        let registry = Registry::new();
        let ctx = HandlerContext::new(aether_jobs::JobManager::spawn(), true);
        let responder = RecordingResponder {
            sent: Mutex::new(vec![]),
        };
        let result = registry.dispatch(&ctx, 250, vec![], None, &responder).await;
        assert!(matches!(result, Err(AgentError::UnknownAction(250))));
        ctx.jobs.shutdown().await;
    }

    #[tokio::test]
    async fn job_status_reports_not_found_for_unknown_job() {
        let registry = Registry::new();
        let ctx = HandlerContext::new(aether_jobs::JobManager::spawn(), true);
        let responder = RecordingResponder {
            sent: Mutex::new(vec![]),
        };
        let data = aether_protocol::Value::map()
            .field("jobId", aether_protocol::Value::Str("missing".into()))
            .build()
            .encode();
        let result = registry
            .dispatch(&ctx, Action::JobStatus.as_u8(), data, None, &responder)
            .await;
        assert!(matches!(result, Err(AgentError::JobNotFound(_))));
        assert!(responder.sent.lock().unwrap().is_empty());
        ctx.jobs.shutdown().await;
    }
}
