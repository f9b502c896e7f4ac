//! Stages a conversion job moves through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stage of a conversion job.
///
/// Ordering among the in-progress stages is advisory: the conversion engine
/// may skip stages depending on configuration, and nothing here enforces the
/// order. Only the in-progress/terminal boundary is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStage {
    #[default]
    Queued,
    Parsing,
    ExtractingMetadata,
    Rendering,
    LayingOut,
    Optimizing,
    GeneratingPdf,
    Completed,
    Failed,
    Cancelled,
}

impl JobStage {
    /// All stages, in nominal pipeline order.
    pub const ALL: [JobStage; 10] = [
        JobStage::Queued,
        JobStage::Parsing,
        JobStage::ExtractingMetadata,
        JobStage::Rendering,
        JobStage::LayingOut,
        JobStage::Optimizing,
        JobStage::GeneratingPdf,
        JobStage::Completed,
        JobStage::Failed,
        JobStage::Cancelled,
    ];

    /// Returns true for stages after which no further updates may follow.
    pub fn is_terminal(self) -> bool {
        match self {
            JobStage::Completed | JobStage::Failed | JobStage::Cancelled => true,
            JobStage::Queued
            | JobStage::Parsing
            | JobStage::ExtractingMetadata
            | JobStage::Rendering
            | JobStage::LayingOut
            | JobStage::Optimizing
            | JobStage::GeneratingPdf => false,
        }
    }

    /// Returns true while the job is still running.
    pub fn is_in_progress(self) -> bool {
        !self.is_terminal()
    }

    /// Wire name, as stored in checkpoints and carried in events.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::Queued => "queued",
            JobStage::Parsing => "parsing",
            JobStage::ExtractingMetadata => "extracting-metadata",
            JobStage::Rendering => "rendering",
            JobStage::LayingOut => "laying-out",
            JobStage::Optimizing => "optimizing",
            JobStage::GeneratingPdf => "generating-pdf",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
            JobStage::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Queued => write!(f, "Queued"),
            JobStage::Parsing => write!(f, "Parsing markup"),
            JobStage::ExtractingMetadata => write!(f, "Extracting metadata"),
            JobStage::Rendering => write!(f, "Rendering"),
            JobStage::LayingOut => write!(f, "Laying out pages"),
            JobStage::Optimizing => write!(f, "Optimizing"),
            JobStage::GeneratingPdf => write!(f, "Generating PDF"),
            JobStage::Completed => write!(f, "Completed"),
            JobStage::Failed => write!(f, "Failed"),
            JobStage::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Error returned when parsing an unknown stage name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for JobStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}
