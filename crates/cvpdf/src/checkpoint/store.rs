//! Typed checkpoint CRUD over a single durable-store key.
//!
//! Every checkpoint lives in one JSON object under one fixed key, so a write
//! touches a single entry in the durable store. Each operation is a full
//! read-modify-write; within one process the cycles are serialized by an
//! async mutex so writes apply in call order.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use super::{CheckpointMap, JobCheckpoint};
use crate::clock::Clock;
use crate::error::CheckpointError;
use crate::stage::JobStage;
use crate::store::DurableStore;

/// Default durable-store key holding the checkpoint map.
pub const DEFAULT_CHECKPOINT_KEY: &str = "conversionCheckpoints";

pub struct CheckpointStore {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    key: String,
    write_guard: Mutex<()>,
}

impl CheckpointStore {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_key(store, clock, DEFAULT_CHECKPOINT_KEY)
    }

    pub fn with_key(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>, key: &str) -> Self {
        Self {
            store,
            clock,
            key: key.to_string(),
            write_guard: Mutex::new(()),
        }
    }

    /// The durable-store key this store reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads every checkpoint. A missing blob reads as an empty map.
    pub async fn load_all(&self) -> Result<CheckpointMap, CheckpointError> {
        match self.store.get(&self.key).await? {
            Some(Value::Null) | None => Ok(CheckpointMap::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Reads a single checkpoint.
    pub async fn get(&self, job_id: &str) -> Result<Option<JobCheckpoint>, CheckpointError> {
        Ok(self.load_all().await?.remove(job_id))
    }

    /// Creates or updates the checkpoint for `job_id`.
    ///
    /// `start_time` is kept from an existing record; `last_update` and
    /// `status` are replaced. `tsx` is stored only when supplied. Writing over
    /// a terminal checkpoint is refused until the job is cleared.
    pub async fn save(
        &self,
        job_id: &str,
        status: JobStage,
        tsx: Option<&str>,
    ) -> Result<JobCheckpoint, CheckpointError> {
        let _guard = self.write_guard.lock().await;

        let mut checkpoints = self.load_all().await?;
        let now = self.clock.now_millis();

        let start_time = match checkpoints.get(job_id) {
            Some(existing) if existing.is_terminal() => {
                return Err(CheckpointError::TerminalStage {
                    job_id: job_id.to_string(),
                    stage: existing.status,
                });
            }
            Some(existing) => existing.start_time,
            None => now,
        };

        let checkpoint = JobCheckpoint {
            job_id: job_id.to_string(),
            status,
            start_time,
            last_update: now,
            tsx: tsx.map(str::to_string),
        };
        checkpoints.insert(job_id.to_string(), checkpoint.clone());

        self.write_all(&checkpoints).await?;
        Ok(checkpoint)
    }

    /// Removes the checkpoint for `job_id`. Returns whether one existed.
    pub async fn clear(&self, job_id: &str) -> Result<bool, CheckpointError> {
        let removed = self.clear_many(&[job_id.to_string()]).await?;
        Ok(removed == 1)
    }

    /// Removes several checkpoints in one write. Returns how many existed.
    pub async fn clear_many(&self, job_ids: &[String]) -> Result<usize, CheckpointError> {
        let _guard = self.write_guard.lock().await;

        let mut checkpoints = self.load_all().await?;
        let removed = job_ids
            .iter()
            .filter(|id| checkpoints.remove(id.as_str()).is_some())
            .count();

        if removed > 0 {
            self.write_all(&checkpoints).await?;
        }
        Ok(removed)
    }

    async fn write_all(&self, checkpoints: &CheckpointMap) -> Result<(), CheckpointError> {
        if checkpoints.is_empty() {
            self.store.remove(&self.key).await?;
        } else {
            let value = serde_json::to_value(checkpoints)?;
            self.store.set(&self.key, value).await?;
        }
        Ok(())
    }
}
