//! Object-store (S3/MinIO) cleanup driver (spec §4.2.3).

use aws_config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tracing::instrument;

use crate::error::{ObjectStoreError, ObjectStoreResult as Result};
use aether_protocol::Connection as ConnSpec;

/// Object channel is unbuffered; the producer blocks until the consumer is
/// ready, giving natural backpressure (spec §5 "unbuffered object channel").
const OBJECT_CHANNEL_CAPACITY: usize = 0;
/// The error channel only ever needs to carry the first failure.
const ERROR_CHANNEL_CAPACITY: usize = 1;
/// How often `CleanupPrefix` reports progress (spec §4.2.3 step 3).
const PROGRESS_BATCH: i64 = 5_000;
/// Max keys per `DeleteObjects` call (the store's own bulk-delete limit).
const DELETE_BATCH: usize = 1_000;

fn endpoint(conn: &ConnSpec) -> String {
    format!("http://{}:{}", conn.host, conn.port)
}

async fn client_for(conn: &ConnSpec) -> Client {
    let region = Region::new("us-east-1");
    let mut builder = aws_sdk_s3::Config::builder()
        .region(region)
        .endpoint_url(endpoint(conn))
        .force_path_style(true)
        .retry_config(RetryConfig::standard());

    if let (Some(access_key), Some(secret_key)) = (&conn.access_key, &conn.secret_key) {
        builder = builder.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "aether-agent",
        ));
    }
    Client::from_conf(builder.build())
}

/// `ListBuckets` (spec §4.2.3): list, drop empty names, sort.
#[instrument(skip(conn))]
pub async fn list_buckets(conn: &ConnSpec) -> Result<Vec<String>> {
    let client = client_for(conn).await;
    let output = client
        .list_buckets()
        .send()
        .await
        .map_err(|err| ObjectStoreError::List {
            bucket: String::new(),
            prefix: String::new(),
            message: err.to_string(),
        })?;

    let mut names: Vec<String> = output
        .buckets()
        .iter()
        .filter_map(|b| b.name())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    Ok(names)
}

/// `ListPrefixes` (spec §4.2.3): non-recursive list at bucket root; keep only
/// virtual folder markers: trailing `/`, no etag, zero modification time.
#[instrument(skip(conn), fields(bucket = %bucket))]
pub async fn list_prefixes(conn: &ConnSpec, bucket: &str) -> Result<Vec<String>> {
    let client = client_for(conn).await;
    let mut names = Vec::new();
    let mut continuation: Option<String> = None;

    loop {
        let mut req = client.list_objects_v2().bucket(bucket).delimiter("/");
        if let Some(token) = &continuation {
            req = req.continuation_token(token);
        }
        let output = req.send().await.map_err(|err| ObjectStoreError::List {
            bucket: bucket.to_string(),
            prefix: String::new(),
            message: err.to_string(),
        })?;

        for obj in output.contents() {
            let key = obj.key().unwrap_or_default();
            if !key.ends_with('/') {
                continue;
            }
            let has_etag = obj.e_tag().map(|e| !e.is_empty()).unwrap_or(false);
            let zero_mtime = obj.last_modified().is_none();
            if !has_etag && zero_mtime && !key.is_empty() {
                names.push(key.to_string());
            }
        }

        if output.is_truncated().unwrap_or(false) {
            continuation = output.next_continuation_token().map(str::to_string);
            if continuation.is_none() {
                break;
            }
        } else {
            break;
        }
    }

    names.sort();
    Ok(names)
}

/// `CleanupPrefix` (spec §4.2.3): recursively list everything under `prefix`
/// through a bounded producer/consumer pipeline and bulk-delete it.
///
/// `on_batch`, when given, is invoked with the delta every `PROGRESS_BATCH`
/// deletes (and once more at the end for the remainder).
#[instrument(skip(conn, on_batch), fields(bucket = %bucket, prefix = %prefix))]
pub async fn cleanup_prefix(
    conn: &ConnSpec,
    bucket: &str,
    prefix: &str,
    mut on_batch: Option<&mut (dyn FnMut(i64) + Send)>,
) -> Result<i64> {
    let prefix = normalize_prefix(prefix)?;
    let client = client_for(conn).await;

    let (mut object_tx, mut object_rx) = mpsc::channel::<String>(OBJECT_CHANNEL_CAPACITY);
    let (mut error_tx, mut error_rx) = mpsc::channel::<ObjectStoreError>(ERROR_CHANNEL_CAPACITY);

    let list_client = client.clone();
    let list_bucket = bucket.to_string();
    let list_prefix = prefix.clone();
    let producer = tokio::spawn(async move {
        let mut continuation: Option<String> = None;
        loop {
            let mut req = list_client
                .list_objects_v2()
                .bucket(&list_bucket)
                .prefix(&list_prefix);
            if let Some(token) = &continuation {
                req = req.continuation_token(token);
            }
            let output = match req.send().await {
                Ok(output) => output,
                Err(err) => {
                    let _ = error_tx
                        .send(ObjectStoreError::List {
                            bucket: list_bucket.clone(),
                            prefix: list_prefix.clone(),
                            message: err.to_string(),
                        })
                        .await;
                    return;
                }
            };

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    if object_tx.send(key.to_string()).await.is_err() {
                        return;
                    }
                }
            }

            if output.is_truncated().unwrap_or(false) {
                continuation = output.next_continuation_token().map(str::to_string);
                if continuation.is_none() {
                    break;
                }
            } else {
                break;
            }
        }
    });

    let mut deleted: i64 = 0;
    let mut since_last_batch: i64 = 0;
    let mut pending_keys: Vec<String> = Vec::with_capacity(DELETE_BATCH);
    let mut pipeline_error: Option<ObjectStoreError> = None;

    'consume: loop {
        tokio::select! {
            biased;
            err = error_rx.next() => {
                if let Some(err) = err {
                    pipeline_error = Some(err);
                }
                break 'consume;
            }
            key = object_rx.next() => {
                match key {
                    Some(key) => {
                        pending_keys.push(key);
                        if pending_keys.len() < DELETE_BATCH {
                            continue 'consume;
                        }
                        let (batch_deleted, batch_error) =
                            flush_delete_batch(&client, bucket, &prefix, &mut pending_keys).await;
                        deleted += batch_deleted;
                        since_last_batch += batch_deleted;
                        if since_last_batch >= PROGRESS_BATCH {
                            if let Some(cb) = on_batch.as_deref_mut() {
                                cb(since_last_batch);
                            }
                            since_last_batch = 0;
                        }
                        if let Some(err) = batch_error {
                            pipeline_error = Some(err);
                            break 'consume;
                        }
                    }
                    None => break 'consume,
                }
            }
        }
    }

    producer.abort();

    if pipeline_error.is_none() && !pending_keys.is_empty() {
        let (batch_deleted, batch_error) =
            flush_delete_batch(&client, bucket, &prefix, &mut pending_keys).await;
        deleted += batch_deleted;
        since_last_batch += batch_deleted;
        pipeline_error = batch_error;
    }

    if since_last_batch > 0 {
        if let Some(cb) = on_batch.as_deref_mut() {
            cb(since_last_batch);
        }
    }

    match pipeline_error {
        Some(err) => Err(err),
        None => Ok(deleted),
    }
}

/// Issue one `DeleteObjects` bulk-delete call against `keys`, draining it.
///
/// Returns the number of objects the call actually acknowledged as deleted
/// and, if the store reported any per-key failure, the first one. The
/// acknowledged count is returned even when an error is present, so a
/// partial batch still gets credit for what it deleted (spec §8 property 6).
async fn flush_delete_batch(
    client: &Client,
    bucket: &str,
    prefix: &str,
    keys: &mut Vec<String>,
) -> (i64, Option<ObjectStoreError>) {
    if keys.is_empty() {
        return (0, None);
    }
    let objects: Vec<ObjectIdentifier> = keys
        .drain(..)
        .filter_map(|key| ObjectIdentifier::builder().key(key).build().ok())
        .collect();
    let delete = match Delete::builder().set_objects(Some(objects)).build() {
        Ok(delete) => delete,
        Err(err) => {
            return (
                0,
                Some(ObjectStoreError::Remove {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                    message: err.to_string(),
                }),
            )
        }
    };

    match client
        .delete_objects()
        .bucket(bucket)
        .delete(delete)
        .send()
        .await
    {
        Ok(output) => {
            let acked = output.deleted().len() as i64;
            let error = output.errors().first().map(|e| ObjectStoreError::Remove {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: format!(
                    "{}: {}",
                    e.key().unwrap_or_default(),
                    e.message().unwrap_or_default()
                ),
            });
            (acked, error)
        }
        Err(err) => (
            0,
            Some(ObjectStoreError::Remove {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: err.to_string(),
            }),
        ),
    }
}

fn normalize_prefix(prefix: &str) -> Result<String> {
    if prefix.is_empty() {
        return Err(ObjectStoreError::Validation(
            "prefix must not be empty".into(),
        ));
    }
    if prefix.ends_with('/') {
        Ok(prefix.to_string())
    } else {
        Ok(format!("{prefix}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prefix_appends_trailing_slash() {
        assert_eq!(normalize_prefix("logs/2024").unwrap(), "logs/2024/");
        assert_eq!(normalize_prefix("logs/2024/").unwrap(), "logs/2024/");
    }

    #[test]
    fn normalize_prefix_rejects_empty() {
        assert!(matches!(
            normalize_prefix(""),
            Err(ObjectStoreError::Validation(_))
        ));
    }
}
