use std::path::PathBuf;
use thiserror::Error;

use crate::stage::JobStage;

#[derive(Error, Debug)]
pub enum CvpdfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Conversion engine error: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Failures of the durable key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Corrupt checkpoint map: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Job {job_id} is already {stage}; clear it before writing a new checkpoint")]
    TerminalStage { job_id: String, stage: JobStage },
}

/// Error reported by the external conversion engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Markup parsing failed: {0}")]
    Parse(String),

    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("Conversion engine unavailable: {0}")]
    Unavailable(String),

    #[error("Conversion cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CvpdfError>;
