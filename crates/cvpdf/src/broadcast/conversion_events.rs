//! Status events streamed from the background context to the UI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::progress::ProgressUpdate;

/// One message on the background → UI channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConversionEvent {
    /// Progress report for a running job.
    #[serde(rename_all = "camelCase")]
    Progress {
        job_id: String,
        progress: ProgressUpdate,
    },
    /// The job produced a PDF.
    #[serde(rename_all = "camelCase")]
    Complete {
        job_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        file_size: u64,
        /// Milliseconds from start to completion.
        duration: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pdf_bytes: Option<Vec<u8>>,
    },
    /// The job failed.
    #[serde(rename_all = "camelCase")]
    Error { job_id: String, error: String },
}

impl ConversionEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ConversionEvent::Progress { job_id, .. }
            | ConversionEvent::Complete { job_id, .. }
            | ConversionEvent::Error { job_id, .. } => job_id,
        }
    }
}

/// Broadcasts conversion events to every subscribed UI.
#[derive(Clone)]
pub struct ConversionEventBroadcaster {
    sender: Arc<broadcast::Sender<ConversionEvent>>,
}

impl ConversionEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: ConversionEvent) {
        // Ignore errors - a closed popup is fine
        let _ = self.sender.send(event);
    }

    pub fn progress(&self, job_id: &str, progress: ProgressUpdate) {
        self.send(ConversionEvent::Progress {
            job_id: job_id.to_string(),
            progress,
        });
    }

    pub fn error(&self, job_id: &str, error: &str) {
        self.send(ConversionEvent::Error {
            job_id: job_id.to_string(),
            error: error.to_string(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversionEvent> {
        self.sender.subscribe()
    }
}

impl Default for ConversionEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
