use crate::error::{ProtocolError, Result};
use crate::value::{field_i64, field_str, field_str_list, field_str_opt, Value};

/// Common connection fields shared by all four cleanup request variants
/// (spec §3): trimmed host, positive port, and backend-specific
/// credentials. Not every backend uses every credential field.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl Connection {
    fn decode(value: &Value) -> Result<Self> {
        let map = value.as_map()?;
        let host = field_str(map, "host")?.trim().to_string();
        if host.is_empty() {
            return Err(ProtocolError::Validation("host must not be empty".into()));
        }
        let port_raw = field_i64(map, "port")?;
        if port_raw <= 0 || port_raw > u16::MAX as i64 {
            return Err(ProtocolError::Validation(format!(
                "port out of range: {port_raw}"
            )));
        }
        Ok(Self {
            host,
            port: port_raw as u16,
            username: field_str_opt(map, "username")?,
            password: field_str_opt(map, "password")?,
            access_key: field_str_opt(map, "accessKey")?,
            secret_key: field_str_opt(map, "secretKey")?,
        })
    }

    /// Basic auth is sent iff username or password is non-blank after trim
    /// (spec §6 "Credentials").
    pub fn basic_auth(&self) -> Option<(String, String)> {
        let user = self.username.as_deref().unwrap_or("").trim();
        let pass = self.password.as_deref().unwrap_or("").trim();
        if user.is_empty() && pass.is_empty() {
            None
        } else {
            Some((user.to_string(), pass.to_string()))
        }
    }
}

fn conn_from_map(value: &Value) -> Result<Connection> {
    Connection::decode(value)
}

fn job_id_from_map(value: &Value) -> Result<Option<String>> {
    let map = value.as_map()?;
    field_str_opt(map, "jobId")
}

fn non_empty_list(list: Vec<String>, field: &'static str) -> Result<Vec<String>> {
    if list.is_empty() {
        return Err(ProtocolError::Validation(format!(
            "'{field}' must be a non-empty list"
        )));
    }
    Ok(list)
}

#[derive(Debug, Clone)]
pub struct ConnOnlyRequest {
    pub conn: Connection,
}

impl ConnOnlyRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        Ok(Self {
            conn: conn_from_map(&value)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RelationalListTablesRequest {
    pub conn: Connection,
    pub database: String,
}

impl RelationalListTablesRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        let map = value.as_map()?;
        let database = field_str(map, "database")?;
        if database.trim().is_empty() {
            return Err(ProtocolError::Validation("database must not be empty".into()));
        }
        Ok(Self {
            conn: conn_from_map(&value)?,
            database,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RelationalDeleteTablesRequest {
    pub conn: Connection,
    pub database: String,
    pub tables: Vec<String>,
    pub job_id: Option<String>,
}

impl RelationalDeleteTablesRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        let map = value.as_map()?;
        let database = field_str(map, "database")?;
        if database.trim().is_empty() {
            return Err(ProtocolError::Validation("database must not be empty".into()));
        }
        let tables = non_empty_list(field_str_list(map, "tables")?, "tables")?;
        Ok(Self {
            conn: conn_from_map(&value)?,
            database,
            tables,
            job_id: job_id_from_map(&value)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct KvCleanupRequest {
    pub conn: Connection,
    pub db: i64,
    pub patterns: Vec<String>,
    pub job_id: Option<String>,
}

impl KvCleanupRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        let map = value.as_map()?;
        let db = field_i64(map, "db")?;
        let patterns = non_empty_list(field_str_list(map, "patterns")?, "patterns")?;
        Ok(Self {
            conn: conn_from_map(&value)?,
            db,
            patterns,
            job_id: job_id_from_map(&value)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ObjectStoreListPrefixesRequest {
    pub conn: Connection,
    pub bucket: String,
}

impl ObjectStoreListPrefixesRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        let map = value.as_map()?;
        let bucket = field_str(map, "bucket")?;
        if bucket.trim().is_empty() {
            return Err(ProtocolError::Validation("bucket must not be empty".into()));
        }
        Ok(Self {
            conn: conn_from_map(&value)?,
            bucket,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ObjectStoreCleanupRequest {
    pub conn: Connection,
    pub bucket: String,
    pub prefixes: Vec<String>,
    pub job_id: Option<String>,
}

impl ObjectStoreCleanupRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        let map = value.as_map()?;
        let bucket = field_str(map, "bucket")?;
        if bucket.trim().is_empty() {
            return Err(ProtocolError::Validation("bucket must not be empty".into()));
        }
        let prefixes = non_empty_list(field_str_list(map, "prefixes")?, "prefixes")?;
        Ok(Self {
            conn: conn_from_map(&value)?,
            bucket,
            prefixes,
            job_id: job_id_from_map(&value)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchCleanupRequest {
    pub conn: Connection,
    pub indices: Vec<String>,
    pub job_id: Option<String>,
}

impl SearchCleanupRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        let map = value.as_map()?;
        let indices = non_empty_list(field_str_list(map, "indices")?, "indices")?;
        Ok(Self {
            conn: conn_from_map(&value)?,
            indices,
            job_id: job_id_from_map(&value)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct JobStatusRequest {
    pub job_id: String,
}

impl JobStatusRequest {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let value = Value::decode(data)?;
        let map = value.as_map()?;
        let job_id = field_str(map, "jobId")?;
        if job_id.is_empty() {
            return Err(ProtocolError::Validation("jobId must not be empty".into()));
        }
        Ok(Self { job_id })
    }
}

/// Encode a sorted string list response (`[]string` actions in spec §6).
pub fn encode_string_list(items: &[String]) -> Vec<u8> {
    Value::Array(items.iter().cloned().map(Value::Str).collect()).encode()
}

/// Encode an `[]int` response (kv-list-databases).
pub fn encode_int_list(items: &[i64]) -> Vec<u8> {
    Value::Array(items.iter().copied().map(Value::I64).collect()).encode()
}

/// The common `{Deleted, Detail?}` result shape for cleanup/job-status
/// actions (spec §3, §6).
#[derive(Debug, Clone)]
pub struct DataCleanupResult {
    pub deleted: i64,
    pub detail: Option<String>,
}

impl DataCleanupResult {
    pub fn encode(&self) -> Vec<u8> {
        let mut builder = Value::map().field("deleted", Value::I64(self.deleted));
        builder = builder.field(
            "detail",
            match &self.detail {
                Some(d) => Value::Str(d.clone()),
                None => Value::Null,
            },
        );
        builder.build().encode()
    }
}
