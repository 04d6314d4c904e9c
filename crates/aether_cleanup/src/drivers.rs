//! Driver seams for the cleanup orchestrators (SPEC_FULL.md §1.4).
//!
//! Each backend's orchestrator talks to its driver through a narrow trait
//! instead of calling `aether_db`/`aether_drivers` free functions directly,
//! so orchestrator progress logic (the part spec §4.4 actually specifies)
//! is testable against an in-memory fake without a live MySQL/Redis/S3/
//! Elasticsearch backend. The production implementation is a thin wrapper
//! that just forwards to the real driver crate and stringifies its error,
//! matching how the orchestrator already downgrades driver errors to
//! strings before handing them to `JobHandle::finalize`.

use async_trait::async_trait;

use aether_protocol::Connection;

pub type DriverResult<T> = std::result::Result<T, String>;

#[async_trait]
pub trait RelationalDriver: Send + Sync {
    async fn delete_tables(
        &self,
        conn: &Connection,
        database: &str,
        tables: &[String],
    ) -> DriverResult<i64>;
}

pub struct LiveRelationalDriver;

#[async_trait]
impl RelationalDriver for LiveRelationalDriver {
    async fn delete_tables(
        &self,
        conn: &Connection,
        database: &str,
        tables: &[String],
    ) -> DriverResult<i64> {
        aether_db::delete_tables(conn, database, tables)
            .await
            .map_err(|e| e.to_string())
    }
}

/// A KV cleanup call that failed partway through still reports how many
/// keys it deleted before the failure (spec §4.2.2 step 4), so the
/// orchestrator can credit the job before finalizing it as failed.
#[derive(Debug)]
pub struct KvCleanupFailure {
    pub partial_deleted: i64,
    pub message: String,
}

impl std::fmt::Display for KvCleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[async_trait]
pub trait KvDriver: Send + Sync {
    async fn cleanup(
        &self,
        conn: &Connection,
        db: i64,
        patterns: &[String],
    ) -> std::result::Result<i64, KvCleanupFailure>;
}

pub struct LiveKvDriver;

#[async_trait]
impl KvDriver for LiveKvDriver {
    async fn cleanup(
        &self,
        conn: &Connection,
        db: i64,
        patterns: &[String],
    ) -> std::result::Result<i64, KvCleanupFailure> {
        aether_drivers::kv::cleanup(conn, db, patterns)
            .await
            .map_err(|e| KvCleanupFailure {
                partial_deleted: e.partial_deleted(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
pub trait ObjectStoreDriver: Send + Sync {
    async fn cleanup_prefix(
        &self,
        conn: &Connection,
        bucket: &str,
        prefix: &str,
        on_batch: &mut (dyn FnMut(i64) + Send),
    ) -> DriverResult<i64>;
}

pub struct LiveObjectStoreDriver;

#[async_trait]
impl ObjectStoreDriver for LiveObjectStoreDriver {
    async fn cleanup_prefix(
        &self,
        conn: &Connection,
        bucket: &str,
        prefix: &str,
        on_batch: &mut (dyn FnMut(i64) + Send),
    ) -> DriverResult<i64> {
        aether_drivers::objectstore::cleanup_prefix(conn, bucket, prefix, Some(on_batch))
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
pub trait SearchDriver: Send + Sync {
    async fn delete_index(&self, conn: &Connection, index: &str) -> DriverResult<i64>;
}

pub struct LiveSearchDriver;

#[async_trait]
impl SearchDriver for LiveSearchDriver {
    async fn delete_index(&self, conn: &Connection, index: &str) -> DriverResult<i64> {
        aether_drivers::search::delete_index(conn, index)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Records every call it receives and returns the scripted outcome for
    /// it, in order. Enough for the orchestrator tests in each sibling
    /// module (spec §8 scenarios 2, 3, 5).
    pub struct ScriptedDriver {
        pub outcomes: Mutex<Vec<DriverResult<i64>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedDriver {
        pub fn new(outcomes: Vec<DriverResult<i64>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn next(&self, target: &str) -> DriverResult<i64> {
            self.calls.lock().unwrap().push(target.to_string());
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                return Err(format!("no scripted outcome left for {target}"));
            }
            outcomes.remove(0)
        }
    }

    #[async_trait]
    impl RelationalDriver for ScriptedDriver {
        async fn delete_tables(
            &self,
            _conn: &Connection,
            _database: &str,
            tables: &[String],
        ) -> DriverResult<i64> {
            self.next(&tables[0])
        }
    }

    #[async_trait]
    impl KvDriver for ScriptedDriver {
        async fn cleanup(
            &self,
            _conn: &Connection,
            _db: i64,
            patterns: &[String],
        ) -> std::result::Result<i64, KvCleanupFailure> {
            self.next(&patterns[0]).map_err(|message| KvCleanupFailure {
                partial_deleted: 0,
                message,
            })
        }
    }

    /// Kv-specific fake that, unlike [`ScriptedDriver`], can script a
    /// partial-delete count alongside a failure (spec §4.2.2 step 4).
    pub struct ScriptedKvDriver {
        pub outcomes: Mutex<Vec<std::result::Result<i64, KvCleanupFailure>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedKvDriver {
        pub fn new(outcomes: Vec<std::result::Result<i64, KvCleanupFailure>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl KvDriver for ScriptedKvDriver {
        async fn cleanup(
            &self,
            _conn: &Connection,
            _db: i64,
            patterns: &[String],
        ) -> std::result::Result<i64, KvCleanupFailure> {
            self.calls.lock().unwrap().push(patterns[0].clone());
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                return Err(KvCleanupFailure {
                    partial_deleted: 0,
                    message: format!("no scripted outcome left for {}", patterns[0]),
                });
            }
            outcomes.remove(0)
        }
    }

    #[async_trait]
    impl SearchDriver for ScriptedDriver {
        async fn delete_index(&self, _conn: &Connection, index: &str) -> DriverResult<i64> {
            self.next(index)
        }
    }

    /// Object-store fake additionally drives the `on_batch` callback so
    /// progress-batch tests (spec §8 scenario 3) don't need a live pipeline.
    pub struct ScriptedObjectStoreDriver {
        pub batches: Mutex<Vec<Vec<i64>>>,
        pub fail_after: Mutex<Option<String>>,
    }

    impl ScriptedObjectStoreDriver {
        pub fn new(batches: Vec<Vec<i64>>) -> Self {
            Self {
                batches: Mutex::new(batches),
                fail_after: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ObjectStoreDriver for ScriptedObjectStoreDriver {
        async fn cleanup_prefix(
            &self,
            _conn: &Connection,
            _bucket: &str,
            _prefix: &str,
            on_batch: &mut (dyn FnMut(i64) + Send),
        ) -> DriverResult<i64> {
            let deltas = self.batches.lock().unwrap().remove(0);
            let mut total = 0i64;
            for delta in deltas {
                on_batch(delta);
                total += delta;
            }
            if let Some(message) = self.fail_after.lock().unwrap().take() {
                return Err(message);
            }
            Ok(total)
        }
    }
}
