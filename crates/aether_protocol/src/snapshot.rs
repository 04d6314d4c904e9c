use serde::{Deserialize, Serialize};

/// Job status (spec §3): `running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

/// The backend a job belongs to (spec §3 `module`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    Relational,
    Kv,
    ObjectStore,
    Search,
}

/// Immutable copy of a job's public fields (spec §3 "Snapshot").
///
/// This is what `job-status` and a cleanup action's `Detail` field carry,
/// JSON-encoded. Deliberately excludes `updatedAt`/`expiresAt`, an open
/// question answered by following the source's silence (see SPEC_FULL.md
/// §4, DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub module: Module,
    pub status: JobStatus,
    pub current: String,
    pub done: i64,
    pub total: i64,
    pub deleted: i64,
    pub seq: u64,
    pub error: String,
}

/// Wire shape of the `Detail` JSON (spec §6): `deleted` is carried separately
/// on `DataCleanupResult`, not duplicated here.
#[derive(Serialize)]
struct SnapshotDetail<'a> {
    #[serde(rename = "jobId")]
    job_id: &'a str,
    module: Module,
    status: JobStatus,
    current: &'a str,
    done: i64,
    total: i64,
    seq: u64,
    error: &'a str,
}

impl Snapshot {
    pub fn to_detail_json(&self) -> String {
        let detail = SnapshotDetail {
            job_id: &self.job_id,
            module: self.module,
            status: self.status,
            current: &self.current,
            done: self.done,
            total: self.total,
            seq: self.seq,
            error: &self.error,
        };
        serde_json::to_string(&detail).expect("SnapshotDetail fields are all JSON-representable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_expected_field_names() {
        let snap = Snapshot {
            job_id: "R1".into(),
            module: Module::Relational,
            status: JobStatus::Running,
            current: "t1".into(),
            done: 0,
            total: 3,
            deleted: 0,
            seq: 1,
            error: String::new(),
        };
        let json = snap.to_detail_json();
        assert!(json.contains("\"jobId\":\"R1\""));
        assert!(json.contains("\"status\":\"running\""));
        assert!(json.contains("\"module\":\"relational\""));
        assert!(!json.contains("updatedAt"));
        assert!(!json.contains("expiresAt"));
    }

    #[test]
    fn detail_json_omits_deleted() {
        let snap = Snapshot {
            job_id: "R1".into(),
            module: Module::Relational,
            status: JobStatus::Success,
            current: "t3".into(),
            done: 3,
            total: 3,
            deleted: 42,
            seq: 4,
            error: String::new(),
        };
        let json = snap.to_detail_json();
        assert!(!json.contains("deleted"), "{json}");
    }
}
