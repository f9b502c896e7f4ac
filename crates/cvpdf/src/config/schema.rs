use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::checkpoint::store::DEFAULT_CHECKPOINT_KEY;

/// Five minutes: jobs updated more recently than this are considered live
/// when the background context restarts.
pub const DEFAULT_ORPHAN_THRESHOLD_MS: i64 = 5 * 60 * 1000;

/// Number of recent percentage samples kept for velocity estimation.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Jobs projected to take less than this never show an ETA.
pub const DEFAULT_MIN_ETA_TOTAL_MS: i64 = 3_000;

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

/// Tuning for checkpointing, orphan detection and progress estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingConfig {
    /// Durable-store key holding the checkpoint map.
    pub checkpoint_key: String,
    pub orphan_threshold_ms: i64,
    pub history_window: usize,
    pub min_eta_total_ms: i64,
    /// Delete stale and settled checkpoints during the startup scan.
    pub purge_stale_checkpoints: bool,
    pub event_channel_capacity: usize,
    /// SQLite file backing the durable store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            checkpoint_key: DEFAULT_CHECKPOINT_KEY.to_string(),
            orphan_threshold_ms: DEFAULT_ORPHAN_THRESHOLD_MS,
            history_window: DEFAULT_HISTORY_WINDOW,
            min_eta_total_ms: DEFAULT_MIN_ETA_TOTAL_MS,
            purge_stale_checkpoints: false,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            database_path: None,
        }
    }
}

impl TrackingConfig {
    /// Configured database path, falling back to the per-user default.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::store::default_database_path)
    }
}
