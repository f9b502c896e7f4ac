//! Event streaming between the background context and the UI.

pub mod conversion_events;
pub mod listener;

pub use conversion_events::{ConversionEvent, ConversionEventBroadcaster};
pub use listener::{spawn_progress_listener, SharedProgressTracker};
