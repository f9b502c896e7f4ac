//! Durable per-job checkpoints used for crash recovery.

pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stage::JobStage;

pub use store::CheckpointStore;

/// Last-known state of an active job, as persisted by the background context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCheckpoint {
    /// Job identifier, unique among concurrently active jobs.
    pub job_id: String,
    /// Current stage.
    pub status: JobStage,
    /// Epoch millis of the first write. Never overwritten.
    pub start_time: i64,
    /// Epoch millis of the latest write.
    pub last_update: i64,
    /// Snapshot of the input markup, only when the caller supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsx: Option<String>,
}

impl JobCheckpoint {
    /// Milliseconds since the last write. Clock skew never yields a negative age.
    pub fn age_millis(&self, now: i64) -> i64 {
        (now - self.last_update).max(0)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// All checkpoints, keyed by job ID. Persisted as one JSON object.
pub type CheckpointMap = BTreeMap<String, JobCheckpoint>;
