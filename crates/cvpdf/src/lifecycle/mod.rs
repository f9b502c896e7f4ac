//! Background-context lifecycle: checkpoint writes and crash recovery.

pub mod manager;
pub mod signals;

pub use manager::{classify, CheckpointClass, LifecycleManager, OrphanedJob, StartupReport};
pub use signals::{InstallReason, LifecycleEvent, LifecycleSignals};
