//! Key-value (Redis) cleanup driver (spec §4.2.2).

use redis::aio::MultiplexedConnection;
use redis::{Client, Value as RedisValue};
use tracing::instrument;

use crate::error::{KvError, Result};
use aether_protocol::Connection as ConnSpec;

/// Keys scanned per `SCAN` round (spec §4.2.2 step 2 "fixed batch hint").
const SCAN_BATCH_HINT: usize = 500;

fn addr(conn: &ConnSpec) -> String {
    format!("{}:{}", conn.host, conn.port)
}

fn client_for(conn: &ConnSpec) -> Result<Client> {
    let mut url = String::from("redis://");
    if let Some((user, pass)) = conn.basic_auth() {
        if !user.is_empty() {
            url.push_str(&urlencoding::encode(&user));
        }
        url.push(':');
        url.push_str(&urlencoding::encode(&pass));
        url.push('@');
    }
    url.push_str(&conn.host);
    url.push(':');
    url.push_str(&conn.port.to_string());
    Client::open(url).map_err(|source| KvError::Connect {
        addr: addr(conn),
        source,
    })
}

async fn connect(conn: &ConnSpec) -> Result<MultiplexedConnection> {
    let client = client_for(conn)?;
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|source| KvError::Connect {
            addr: addr(conn),
            source,
        })
}

/// `ListDatabases` (spec §4.2.2): parse the server's `databases` config value
/// out of whichever of the three response shapes it arrives in.
#[instrument(skip(conn), fields(addr = %addr(conn)))]
pub async fn list_databases(conn: &ConnSpec) -> Result<Vec<i64>> {
    let mut redis_conn = connect(conn).await?;
    let _: String = redis::cmd("PING")
        .query_async(&mut redis_conn)
        .await
        .map_err(|source| KvError::Connect {
            addr: addr(conn),
            source,
        })?;

    let reply: RedisValue = redis::cmd("CONFIG")
        .arg("GET")
        .arg("databases")
        .query_async(&mut redis_conn)
        .await
        .map_err(|source| KvError::Connect {
            addr: addr(conn),
            source,
        })?;

    let n = parse_databases_count(&reply)?;
    if n <= 0 {
        return Err(KvError::ConfigShape(format!(
            "databases count must be positive, got {n}"
        )));
    }
    Ok((0..n).collect())
}

/// Accepts a two-element array `["databases", N]`, a string→string map, or a
/// string→any map, and extracts the integer `N` (spec §4.2.2).
fn parse_databases_count(value: &RedisValue) -> Result<i64> {
    match value {
        RedisValue::Array(items) => {
            if items.len() == 2 {
                if let Some(n) = redis_value_as_i64(&items[1]) {
                    return Ok(n);
                }
            }
            for pair in items.chunks(2) {
                if let [key, val] = pair {
                    if redis_value_as_str(key).as_deref() == Some("databases") {
                        if let Some(n) = redis_value_as_i64(val) {
                            return Ok(n);
                        }
                    }
                }
            }
            Err(KvError::ConfigShape(
                "array reply did not contain a 'databases' entry".into(),
            ))
        }
        RedisValue::Map(pairs) => {
            for (key, val) in pairs {
                if redis_value_as_str(key).as_deref() == Some("databases") {
                    return redis_value_as_i64(val).ok_or_else(|| {
                        KvError::ConfigShape("'databases' value is not an integer".into())
                    });
                }
            }
            Err(KvError::ConfigShape(
                "map reply did not contain a 'databases' key".into(),
            ))
        }
        other => Err(KvError::ConfigShape(format!(
            "unexpected reply shape: {other:?}"
        ))),
    }
}

fn redis_value_as_str(value: &RedisValue) -> Option<String> {
    match value {
        RedisValue::BulkString(bytes) => String::from_utf8(bytes.clone()).ok(),
        RedisValue::SimpleString(s) => Some(s.clone()),
        RedisValue::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

fn redis_value_as_i64(value: &RedisValue) -> Option<i64> {
    match value {
        RedisValue::Int(i) => Some(*i),
        _ => redis_value_as_str(value).and_then(|s| s.trim().parse::<i64>().ok()),
    }
}

/// `Cleanup` (spec §4.2.2): select `db`, then for each pattern in order walk
/// the keyspace with a cursor-based `SCAN` and delete each batch.
#[instrument(skip(conn, patterns), fields(addr = %addr(conn), db = db))]
pub async fn cleanup(conn: &ConnSpec, db: i64, patterns: &[String]) -> Result<i64> {
    if patterns.is_empty() {
        return Err(KvError::Validation("patterns must not be empty".into()));
    }

    let mut redis_conn = connect(conn).await?;
    redis::cmd("SELECT")
        .arg(db)
        .query_async::<_, ()>(&mut redis_conn)
        .await
        .map_err(|source| KvError::Connect {
            addr: addr(conn),
            source,
        })?;

    let mut deleted: i64 = 0;
    for pattern in patterns {
        match scan_and_delete_pattern(&mut redis_conn, conn, pattern).await {
            Ok(removed) => deleted += removed,
            Err(mut err) => {
                // Carry forward whatever earlier patterns in this call already
                // deleted, so the caller sees the full partial count rather
                // than just the failing pattern's own (spec §4.2.2 step 4).
                err.add_partial_deleted(deleted);
                return Err(err);
            }
        }
    }
    Ok(deleted)
}

async fn scan_and_delete_pattern(
    redis_conn: &mut MultiplexedConnection,
    conn: &ConnSpec,
    pattern: &str,
) -> Result<i64> {
    let mut cursor: u64 = 0;
    let mut deleted: i64 = 0;
    loop {
        let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_BATCH_HINT)
            .query_async(redis_conn)
            .await
            .map_err(|source| KvError::Scan {
                addr: addr(conn),
                pattern: pattern.to_string(),
                partial_deleted: deleted,
                source,
            })?;

        if !keys.is_empty() {
            let removed: i64 = redis::cmd("DEL")
                .arg(&keys)
                .query_async(redis_conn)
                .await
                .map_err(|source| KvError::Delete {
                    addr: addr(conn),
                    pattern: pattern.to_string(),
                    partial_deleted: deleted,
                    source,
                })?;
            deleted += removed;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_element_array_shape() {
        let reply = RedisValue::Array(vec![
            RedisValue::BulkString(b"databases".to_vec()),
            RedisValue::BulkString(b"16".to_vec()),
        ]);
        assert_eq!(parse_databases_count(&reply).unwrap(), 16);
    }

    #[test]
    fn parses_string_map_shape() {
        let reply = RedisValue::Map(vec![(
            RedisValue::BulkString(b"databases".to_vec()),
            RedisValue::BulkString(b"4".to_vec()),
        )]);
        assert_eq!(parse_databases_count(&reply).unwrap(), 4);
    }

    #[test]
    fn rejects_non_positive_count() {
        let reply = RedisValue::Array(vec![
            RedisValue::BulkString(b"databases".to_vec()),
            RedisValue::BulkString(b"0".to_vec()),
        ]);
        let n = parse_databases_count(&reply).unwrap();
        assert!(n <= 0);
    }

    #[tokio::test]
    async fn cleanup_rejects_empty_patterns_before_connecting() {
        let conn = ConnSpec {
            host: "127.0.0.1".into(),
            port: 6379,
            ..Default::default()
        };
        assert!(matches!(
            cleanup(&conn, 0, &[]).await,
            Err(KvError::Validation(_))
        ));
    }

    #[test]
    fn partial_deleted_carries_forward_across_patterns() {
        let mut err = KvError::Delete {
            addr: "127.0.0.1:6379".into(),
            pattern: "cache:*".into(),
            partial_deleted: 7,
            source: redis::RedisError::from((redis::ErrorKind::IoError, "reset")),
        };
        assert_eq!(err.partial_deleted(), 7);
        err.add_partial_deleted(4);
        assert_eq!(err.partial_deleted(), 11);
    }
}
