//! Checkpoint ownership and orphan detection for the background context.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::signals::{InstallReason, LifecycleEvent, LifecycleSignals};
use crate::checkpoint::{CheckpointStore, JobCheckpoint};
use crate::clock::Clock;
use crate::config::TrackingConfig;
use crate::error::CheckpointError;
use crate::stage::JobStage;
use crate::store::DurableStore;

/// How a surviving checkpoint is treated after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointClass {
    /// Recently updated and still in progress: the process died under it.
    Orphaned,
    /// Old enough to have been abandoned or resolved elsewhere.
    Stale,
    /// Recently updated but already terminal; only awaiting a clear.
    Settled,
}

/// Classifies a checkpoint relative to `now`.
pub fn classify(checkpoint: &JobCheckpoint, now: i64, orphan_threshold_ms: i64) -> CheckpointClass {
    if checkpoint.age_millis(now) >= orphan_threshold_ms {
        CheckpointClass::Stale
    } else if checkpoint.status.is_terminal() {
        CheckpointClass::Settled
    } else {
        CheckpointClass::Orphaned
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedJob {
    pub job_id: String,
    pub stage: JobStage,
    pub age_ms: i64,
    pub checkpoint: JobCheckpoint,
}

/// Outcome of scanning checkpoints after a (re)start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupReport {
    pub scanned_at: i64,
    pub orphaned: Vec<OrphanedJob>,
    pub stale: Vec<String>,
    pub settled: Vec<String>,
    /// Checkpoints deleted by the purge policy.
    pub purged: usize,
}

impl StartupReport {
    pub fn has_orphans(&self) -> bool {
        !self.orphaned.is_empty()
    }

    pub fn total(&self) -> usize {
        self.orphaned.len() + self.stale.len() + self.settled.len()
    }
}

/// Bridges lifecycle signals and the checkpoint store.
///
/// Checkpoint writes and clears are best-effort: failures are logged here and
/// never reach the caller, so a storage outage degrades recovery without
/// breaking the conversion in flight.
pub struct LifecycleManager {
    checkpoints: CheckpointStore,
    clock: Arc<dyn Clock>,
    orphan_threshold_ms: i64,
    purge_stale: bool,
    reports: watch::Sender<Option<StartupReport>>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>, config: &TrackingConfig) -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            checkpoints: CheckpointStore::with_key(store, Arc::clone(&clock), &config.checkpoint_key),
            clock,
            orphan_threshold_ms: config.orphan_threshold_ms,
            purge_stale: config.purge_stale_checkpoints,
            reports,
        }
    }

    /// Builds the manager and registers its handler for `signals`.
    ///
    /// The subscription is taken before this returns, so no signal emitted
    /// afterwards is missed. The handler task runs until the signal channel
    /// closes.
    pub fn start(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        config: &TrackingConfig,
        signals: &LifecycleSignals,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let manager = Arc::new(Self::new(store, clock, config));
        let receiver = signals.subscribe();
        let handle = tokio::spawn(Arc::clone(&manager).listen(receiver));
        (manager, handle)
    }

    async fn listen(self: Arc<Self>, mut receiver: broadcast::Receiver<LifecycleEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle_event(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Lifecycle handler lagged, {} signal(s) dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        log::debug!("Lifecycle signal channel closed");
    }

    pub async fn handle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Installed {
                reason,
                previous_version,
            } => self.handle_installed(reason, previous_version.as_deref()),
            LifecycleEvent::Startup => {
                self.handle_startup().await;
            }
        }
    }

    fn handle_installed(&self, reason: InstallReason, previous_version: Option<&str>) {
        match previous_version {
            Some(previous) => log::info!(
                "Extension {} (previous version {}), version {}",
                reason,
                previous,
                env!("CARGO_PKG_VERSION")
            ),
            None => log::info!(
                "Extension {}, version {}",
                reason,
                env!("CARGO_PKG_VERSION")
            ),
        }
    }

    /// Scans checkpoints after a restart and reports orphaned jobs.
    ///
    /// Storage failures are logged and yield `None`; startup is never blocked.
    pub async fn handle_startup(&self) -> Option<StartupReport> {
        match self.scan_checkpoints().await {
            Ok(report) => {
                for orphan in &report.orphaned {
                    log::warn!(
                        "Job {} was orphaned by a restart while {} ({}s since last update)",
                        orphan.job_id,
                        orphan.stage.as_str(),
                        orphan.age_ms / 1000
                    );
                }
                if report.total() > 0 {
                    log::info!(
                        "Startup checkpoint scan: {} orphaned, {} stale, {} settled, {} purged",
                        report.orphaned.len(),
                        report.stale.len(),
                        report.settled.len(),
                        report.purged
                    );
                }
                self.reports.send_replace(Some(report.clone()));
                Some(report)
            }
            Err(e) => {
                log::error!("Failed to check for orphaned jobs: {}", e);
                None
            }
        }
    }

    /// Reads every checkpoint and classifies it. Applies the purge policy.
    pub async fn scan_checkpoints(&self) -> Result<StartupReport, CheckpointError> {
        let checkpoints = self.checkpoints.load_all().await?;
        let now = self.clock.now_millis();

        let mut report = StartupReport {
            scanned_at: now,
            ..Default::default()
        };

        for (job_id, checkpoint) in checkpoints {
            match classify(&checkpoint, now, self.orphan_threshold_ms) {
                CheckpointClass::Orphaned => report.orphaned.push(OrphanedJob {
                    job_id,
                    stage: checkpoint.status,
                    age_ms: checkpoint.age_millis(now),
                    checkpoint,
                }),
                CheckpointClass::Stale => report.stale.push(job_id),
                CheckpointClass::Settled => report.settled.push(job_id),
            }
        }

        if self.purge_stale {
            let removable: Vec<String> = report
                .stale
                .iter()
                .chain(report.settled.iter())
                .cloned()
                .collect();
            if !removable.is_empty() {
                match self.checkpoints.clear_many(&removable).await {
                    Ok(purged) => report.purged = purged,
                    Err(e) => log::error!("Failed to purge stale checkpoints: {}", e),
                }
            }
        }

        Ok(report)
    }

    /// Persists the job's current stage. Failures are logged, never returned.
    pub async fn save_job_checkpoint(&self, job_id: &str, status: JobStage, tsx: Option<&str>) {
        match self.checkpoints.save(job_id, status, tsx).await {
            Ok(_) => log::debug!("Checkpoint saved for job {}: {}", job_id, status.as_str()),
            Err(e) => log::error!("Failed to save checkpoint for job {}: {}", job_id, e),
        }
    }

    /// Discards the job's checkpoint. Failures are logged, never returned.
    pub async fn clear_job_checkpoint(&self, job_id: &str) {
        match self.checkpoints.clear(job_id).await {
            Ok(true) => log::debug!("Checkpoint cleared for job {}", job_id),
            Ok(false) => {}
            Err(e) => log::error!("Failed to clear checkpoint for job {}: {}", job_id, e),
        }
    }

    /// Latest startup report, updated after every scan.
    pub fn reports(&self) -> watch::Receiver<Option<StartupReport>> {
        self.reports.subscribe()
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Age at which a checkpoint stops counting as a live job.
    pub fn orphan_threshold_ms(&self) -> i64 {
        self.orphan_threshold_ms
    }
}
