use std::time::Duration;

use async_trait::async_trait;

use aether_protocol::requests::{
    encode_int_list, encode_string_list, ConnOnlyRequest, JobStatusRequest, KvCleanupRequest,
    ObjectStoreCleanupRequest, ObjectStoreListPrefixesRequest, RelationalDeleteTablesRequest,
    RelationalListTablesRequest, SearchCleanupRequest,
};
use aether_protocol::DataCleanupResult;

use crate::context::{HandlerContext, SendResponse};
use crate::error::{AgentError, Result};

/// Per-call timeout for list-type actions (spec §4.5).
pub const LIST_TIMEOUT: Duration = Duration::from_secs(20);

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()>;
}

async fn respond_list(
    request_id: Option<u32>,
    responder: &dyn SendResponse,
    names: Vec<String>,
) -> Result<()> {
    responder.send(encode_string_list(&names), request_id);
    Ok(())
}

pub struct RelationalListDatabases;
#[async_trait]
impl Handler for RelationalListDatabases {
    async fn handle(
        &self,
        _ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = ConnOnlyRequest::decode(data)?;
        let names = tokio::time::timeout(LIST_TIMEOUT, aether_db::list_databases(&req.conn))
            .await
            .map_err(|_| AgentError::Timeout)??;
        respond_list(request_id, responder, names).await
    }
}

pub struct RelationalListTables;
#[async_trait]
impl Handler for RelationalListTables {
    async fn handle(
        &self,
        _ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = RelationalListTablesRequest::decode(data)?;
        let names = tokio::time::timeout(
            LIST_TIMEOUT,
            aether_db::list_tables(&req.conn, &req.database),
        )
        .await
        .map_err(|_| AgentError::Timeout)??;
        respond_list(request_id, responder, names).await
    }
}

pub struct RelationalDeleteTables;
#[async_trait]
impl Handler for RelationalDeleteTables {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = RelationalDeleteTablesRequest::decode(data)?;
        let result = aether_cleanup::run_relational_cleanup(&ctx.jobs, req).await?;
        responder.send(result.encode(), request_id);
        Ok(())
    }
}

pub struct KvListDatabases;
#[async_trait]
impl Handler for KvListDatabases {
    async fn handle(
        &self,
        _ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = ConnOnlyRequest::decode(data)?;
        let dbs = tokio::time::timeout(LIST_TIMEOUT, aether_drivers::kv::list_databases(&req.conn))
            .await
            .map_err(|_| AgentError::Timeout)??;
        responder.send(encode_int_list(&dbs), request_id);
        Ok(())
    }
}

pub struct KvCleanup;
#[async_trait]
impl Handler for KvCleanup {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = KvCleanupRequest::decode(data)?;
        let result = aether_cleanup::run_kv_cleanup(&ctx.jobs, req).await?;
        responder.send(result.encode(), request_id);
        Ok(())
    }
}

pub struct ObjectStoreListBuckets;
#[async_trait]
impl Handler for ObjectStoreListBuckets {
    async fn handle(
        &self,
        _ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = ConnOnlyRequest::decode(data)?;
        let names = tokio::time::timeout(
            LIST_TIMEOUT,
            aether_drivers::objectstore::list_buckets(&req.conn),
        )
        .await
        .map_err(|_| AgentError::Timeout)??;
        respond_list(request_id, responder, names).await
    }
}

pub struct ObjectStoreListPrefixes;
#[async_trait]
impl Handler for ObjectStoreListPrefixes {
    async fn handle(
        &self,
        _ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = ObjectStoreListPrefixesRequest::decode(data)?;
        let names = tokio::time::timeout(
            LIST_TIMEOUT,
            aether_drivers::objectstore::list_prefixes(&req.conn, &req.bucket),
        )
        .await
        .map_err(|_| AgentError::Timeout)??;
        respond_list(request_id, responder, names).await
    }
}

pub struct ObjectStoreCleanup;
#[async_trait]
impl Handler for ObjectStoreCleanup {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = ObjectStoreCleanupRequest::decode(data)?;
        let result = aether_cleanup::run_objectstore_cleanup(&ctx.jobs, req).await?;
        responder.send(result.encode(), request_id);
        Ok(())
    }
}

pub struct SearchListIndices;
#[async_trait]
impl Handler for SearchListIndices {
    async fn handle(
        &self,
        _ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = ConnOnlyRequest::decode(data)?;
        let names = tokio::time::timeout(LIST_TIMEOUT, aether_drivers::search::list_indices(&req.conn))
            .await
            .map_err(|_| AgentError::Timeout)??;
        respond_list(request_id, responder, names).await
    }
}

pub struct SearchCleanup;
#[async_trait]
impl Handler for SearchCleanup {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = SearchCleanupRequest::decode(data)?;
        let result = aether_cleanup::run_search_cleanup(&ctx.jobs, req).await?;
        responder.send(result.encode(), request_id);
        Ok(())
    }
}

pub struct JobStatus;
#[async_trait]
impl Handler for JobStatus {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        data: &[u8],
        request_id: Option<u32>,
        responder: &dyn SendResponse,
    ) -> Result<()> {
        let req = JobStatusRequest::decode(data)?;
        let snapshot = ctx
            .jobs
            .snapshot(&req.job_id)
            .ok_or_else(|| AgentError::JobNotFound(req.job_id.clone()))?;
        let result = DataCleanupResult {
            deleted: snapshot.deleted,
            detail: Some(snapshot.to_detail_json()),
        };
        responder.send(result.encode(), request_id);
        Ok(())
    }
}
