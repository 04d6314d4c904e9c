//! Search (Elasticsearch) cleanup driver (spec §4.2.4).

use serde::Deserialize;
use tracing::instrument;

use crate::error::{SearchError, SearchResult as Result};
use aether_protocol::Connection as ConnSpec;

/// Bound on the error body excerpt surfaced to callers (spec §4.2.4 step 1).
const ERROR_BODY_LIMIT: usize = 4 * 1024;

fn base_url(conn: &ConnSpec) -> Result<String> {
    if conn.host.contains("://") {
        return Err(SearchError::HostHasScheme(conn.host.clone()));
    }
    Ok(format!("http://{}:{}", conn.host, conn.port))
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn apply_auth(
    builder: reqwest::RequestBuilder,
    conn: &ConnSpec,
) -> reqwest::RequestBuilder {
    match conn.basic_auth() {
        Some((user, pass)) => builder.basic_auth(user, Some(pass)),
        None => builder,
    }
}

async fn bounded_error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body.chars().take(ERROR_BODY_LIMIT).collect(),
        Err(_) => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct CatIndexEntry {
    #[serde(default)]
    index: String,
}

/// `ListIndices` (spec §4.2.4): GET a cat-style indices endpoint, drop empty
/// `index` fields, sort.
#[instrument(skip(conn))]
pub async fn list_indices(conn: &ConnSpec) -> Result<Vec<String>> {
    let url = format!("{}/_cat/indices?format=json", base_url(conn)?);
    let builder = apply_auth(client().get(&url), conn);
    let response = builder.send().await.map_err(|source| SearchError::Http {
        url: url.clone(),
        source,
    })?;

    let status = response.status();
    if status.as_u16() >= 400 {
        let body = bounded_error_body(response).await;
        return Err(SearchError::Status {
            url,
            status: status.as_u16(),
            body,
        });
    }

    let entries: Vec<CatIndexEntry> =
        response.json().await.map_err(|source| SearchError::Http {
            url: url.clone(),
            source,
        })?;

    let mut names: Vec<String> = entries
        .into_iter()
        .map(|e| e.index)
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    Ok(names)
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: i64,
    #[serde(default)]
    failures: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// `DeleteIndex` (spec §4.2.4): delete-by-query match_all with
/// `conflicts=proceed`.
#[instrument(skip(conn), fields(index = %index))]
pub async fn delete_index(conn: &ConnSpec, index: &str) -> Result<i64> {
    if index.is_empty() {
        return Err(SearchError::Validation("index must not be empty".into()));
    }
    let escaped = urlencoding::encode(index);
    let url = format!(
        "{}/{}/_delete_by_query?conflicts=proceed",
        base_url(conn)?,
        escaped
    );

    let body = serde_json::json!({ "query": { "match_all": {} } });
    let builder = apply_auth(client().post(&url), conn)
        .header("content-type", "application/json")
        .json(&body);
    let response = builder.send().await.map_err(|source| SearchError::Http {
        url: url.clone(),
        source,
    })?;

    let status = response.status();
    if status.as_u16() >= 400 {
        let body = bounded_error_body(response).await;
        return Err(SearchError::Status {
            url,
            status: status.as_u16(),
            body,
        });
    }

    let parsed: DeleteByQueryResponse =
        response.json().await.map_err(|source| SearchError::Http {
            url: url.clone(),
            source,
        })?;

    if let Some(message) = failure_message(&parsed) {
        return Err(SearchError::DeleteFailures {
            index: index.to_string(),
            message,
        });
    }

    Ok(parsed.deleted)
}

/// Surfaces `error` when present, else the `failures` entries joined, else a
/// generic message. `None` when neither `error` nor `failures` fired
/// (spec §4.2.4 step 4).
fn failure_message(parsed: &DeleteByQueryResponse) -> Option<String> {
    let error_text = parsed
        .error
        .as_ref()
        .map(|e| e.to_string())
        .filter(|s| !s.is_empty() && s != "null");

    if parsed.failures.is_empty() && error_text.is_none() {
        return None;
    }

    Some(error_text.unwrap_or_else(|| {
        let joined = parsed
            .failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        if joined.is_empty() {
            "failures detected".to_string()
        } else {
            joined
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(host: &str) -> ConnSpec {
        ConnSpec {
            host: host.into(),
            port: 9200,
            ..Default::default()
        }
    }

    #[test]
    fn base_url_rejects_host_with_scheme() {
        assert!(matches!(
            base_url(&conn("https://es.internal")),
            Err(SearchError::HostHasScheme(_))
        ));
    }

    #[test]
    fn base_url_synthesizes_http() {
        assert_eq!(base_url(&conn("es.internal")).unwrap(), "http://es.internal:9200");
    }

    #[tokio::test]
    async fn delete_index_rejects_empty_index() {
        assert!(matches!(
            delete_index(&conn("es.internal"), "").await,
            Err(SearchError::Validation(_))
        ));
    }

    #[test]
    fn failure_message_surfaces_failure_cause_when_error_is_blank() {
        let parsed = DeleteByQueryResponse {
            deleted: 42,
            failures: vec![serde_json::json!({"index": "i2", "cause": "version_conflict"})],
            error: None,
        };
        let message = failure_message(&parsed).unwrap();
        assert!(message.contains("version_conflict"), "{message}");
    }

    #[test]
    fn failure_message_is_none_on_clean_response() {
        let parsed = DeleteByQueryResponse {
            deleted: 10,
            failures: vec![],
            error: None,
        };
        assert!(failure_message(&parsed).is_none());
    }
}
