//! Boundary to the external markup → PDF engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::progress::ProgressUpdate;

/// A conversion job as handed to the background context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub job_id: String,
    /// Raw CV markup.
    pub tsx: String,
    /// Suggested name for the produced file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Keep a copy of the markup in the job's checkpoint.
    #[serde(default)]
    pub checkpoint_markup: bool,
}

impl ConversionRequest {
    pub fn new(job_id: &str, tsx: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            tsx: tsx.to_string(),
            filename: None,
            checkpoint_markup: false,
        }
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    pub fn with_checkpointed_markup(mut self) -> Self {
        self.checkpoint_markup = true;
        self
    }
}

/// A finished PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub filename: String,
    pub pdf_bytes: Vec<u8>,
}

/// Receives progress from the engine while a conversion runs.
#[async_trait]
pub trait StageReporter: Send + Sync {
    async fn report(&self, update: ProgressUpdate);
}

/// The opaque engine that parses markup and renders the PDF.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    async fn convert(
        &self,
        request: &ConversionRequest,
        reporter: &dyn StageReporter,
    ) -> Result<ConversionOutput, EngineError>;
}
