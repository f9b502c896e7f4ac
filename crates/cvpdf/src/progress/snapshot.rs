use serde::{Deserialize, Serialize};

use crate::stage::JobStage;

/// Label shown when a conversion has just been started.
pub const STARTING_OPERATION: &str = "Starting conversion...";

/// Live progress of one job, as rendered by the UI.
///
/// `percentage` is stored exactly as reported; values outside 0..=100 are
/// kept and surfaced unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub stage: JobStage,
    pub percentage: f64,
    pub current_operation: String,
    /// Seconds until completion, only while 0 < percentage < 100 and the
    /// projected total duration is long enough to be worth estimating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl ProgressSnapshot {
    pub fn starting() -> Self {
        Self {
            stage: JobStage::Queued,
            percentage: 0.0,
            current_operation: STARTING_OPERATION.to_string(),
            estimated_time_remaining: None,
            pages_processed: None,
            total_pages: None,
        }
    }

    /// Returns true when every reported field matches `update`.
    pub fn matches(&self, update: &ProgressUpdate) -> bool {
        self.stage == update.stage
            && self.percentage == update.percentage
            && self.current_operation == update.current_operation
            && self.pages_processed == update.pages_processed
            && self.total_pages == update.total_pages
    }
}

/// Progress fields reported by the conversion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub stage: JobStage,
    pub percentage: f64,
    pub current_operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl ProgressUpdate {
    pub fn new(stage: JobStage, percentage: f64, current_operation: &str) -> Self {
        Self {
            stage,
            percentage,
            current_operation: current_operation.to_string(),
            pages_processed: None,
            total_pages: None,
        }
    }

    pub fn with_pages(mut self, processed: u32, total: u32) -> Self {
        self.pages_processed = Some(processed);
        self.total_pages = Some(total);
        self
    }

    pub(crate) fn into_snapshot(self, estimated_time_remaining: Option<u64>) -> ProgressSnapshot {
        ProgressSnapshot {
            stage: self.stage,
            percentage: self.percentage,
            current_operation: self.current_operation,
            estimated_time_remaining,
            pages_processed: self.pages_processed,
            total_pages: self.total_pages,
        }
    }
}
