use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::error::{RelationalError, Result};
use aether_protocol::Connection as ConnSpec;

/// Connections opened by this driver are short-lived and per-request, not a
/// long-lived application pool: 2 open, 2 idle, 5-minute max lifetime.
const POOL_MAX_CONNECTIONS: u32 = 2;
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);

pub fn addr(conn: &ConnSpec) -> String {
    format!("{}:{}", conn.host, conn.port)
}

/// Open a short-lived pool against `database` (empty string = no database
/// selected, used for `SHOW DATABASES`).
pub async fn connect(conn: &ConnSpec, database: &str, connect_timeout: Duration) -> Result<MySqlPool> {
    let mut options = MySqlConnectOptions::new()
        .host(&conn.host)
        .port(conn.port);
    if let Some(user) = conn.username.as_deref().filter(|u| !u.trim().is_empty()) {
        options = options.username(user.trim());
    }
    if let Some(pass) = conn.password.as_deref() {
        options = options.password(pass);
    }
    if !database.is_empty() {
        options = options.database(database);
    }

    let addr = addr(conn);
    tokio::time::timeout(
        connect_timeout,
        MySqlPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .min_connections(POOL_MAX_CONNECTIONS)
            .max_lifetime(POOL_MAX_LIFETIME)
            .connect_with(options),
    )
    .await
    .map_err(|_| RelationalError::Timeout { addr: addr.clone() })?
    .map_err(|source| RelationalError::Connect { addr, source })
}
