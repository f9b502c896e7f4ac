//! Process lifecycle signals delivered by the host platform.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why the "installed" signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    Install,
    Update,
    BrowserUpdate,
    SharedModuleUpdate,
}

impl std::fmt::Display for InstallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallReason::Install => write!(f, "install"),
            InstallReason::Update => write!(f, "update"),
            InstallReason::BrowserUpdate => write!(f, "browser update"),
            InstallReason::SharedModuleUpdate => write!(f, "shared module update"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// The process was installed or updated.
    #[serde(rename_all = "camelCase")]
    Installed {
        reason: InstallReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_version: Option<String>,
    },
    /// The process (re)started.
    Startup,
}

/// Fan-out of lifecycle events to subscribed handlers.
#[derive(Clone)]
pub struct LifecycleSignals {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleSignals {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fires a signal. Firing with no subscribers is fine.
    pub fn emit(&self, event: LifecycleEvent) {
        let _ = self.sender.send(event);
    }

    pub fn installed(&self, reason: InstallReason, previous_version: Option<&str>) {
        self.emit(LifecycleEvent::Installed {
            reason,
            previous_version: previous_version.map(str::to_string),
        });
    }

    pub fn startup(&self) {
        self.emit(LifecycleEvent::Startup);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for LifecycleSignals {
    fn default() -> Self {
        Self::new(16)
    }
}
