//! Drives a shared [`ProgressTracker`] from the conversion event channel.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::conversion_events::ConversionEvent;
use crate::progress::ProgressTracker;

/// Progress tracker shared between the event listener and UI readers.
pub type SharedProgressTracker = Arc<RwLock<ProgressTracker>>;

/// Spawns a task applying every received event to `tracker`.
///
/// Runs until the channel closes. A lagging receiver logs how many events it
/// missed and keeps going; the next progress event rebuilds the state.
pub fn spawn_progress_listener(
    tracker: SharedProgressTracker,
    mut receiver: broadcast::Receiver<ConversionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let mut guard = match tracker.write() {
                        Ok(g) => g,
                        Err(poisoned) => {
                            log::warn!("Progress tracker lock was poisoned, recovering");
                            poisoned.into_inner()
                        }
                    };
                    guard.apply_event(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Progress listener lagged, {} event(s) skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        log::debug!("Conversion event channel closed, progress listener stopping");
    })
}
