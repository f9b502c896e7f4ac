//! Live progress and ETA tracking for the UI process.

pub mod eta;
pub mod snapshot;
pub mod tracker;

pub use eta::{estimate_remaining_secs, ProgressHistory};
pub use snapshot::{ProgressSnapshot, ProgressUpdate, STARTING_OPERATION};
pub use tracker::ProgressTracker;
