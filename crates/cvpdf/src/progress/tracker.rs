//! Per-job live progress cache for the UI process.
//!
//! Not persisted: the tracker is rebuilt from the next progress event each
//! time the UI opens. Snapshots are handed out as `Arc`s; an update that
//! changes nothing keeps the same `Arc`, so consumers comparing with
//! `Arc::ptr_eq` skip redundant re-renders.

use std::collections::HashMap;
use std::sync::Arc;

use super::eta::{estimate_remaining_secs, ProgressHistory};
use super::snapshot::{ProgressSnapshot, ProgressUpdate};
use crate::broadcast::ConversionEvent;
use crate::clock::Clock;
use crate::config::schema::{DEFAULT_HISTORY_WINDOW, DEFAULT_MIN_ETA_TOTAL_MS};
use crate::config::TrackingConfig;
use crate::stage::JobStage;

struct TrackedJob {
    snapshot: Arc<ProgressSnapshot>,
    start_time: i64,
    history: ProgressHistory,
}

pub struct ProgressTracker {
    jobs: HashMap<String, TrackedJob>,
    clock: Arc<dyn Clock>,
    history_window: usize,
    min_eta_total_ms: i64,
}

impl ProgressTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: HashMap::new(),
            clock,
            history_window: DEFAULT_HISTORY_WINDOW,
            min_eta_total_ms: DEFAULT_MIN_ETA_TOTAL_MS,
        }
    }

    pub fn with_config(clock: Arc<dyn Clock>, config: &TrackingConfig) -> Self {
        Self {
            jobs: HashMap::new(),
            clock,
            history_window: config.history_window,
            min_eta_total_ms: config.min_eta_total_ms,
        }
    }

    /// Starts (or restarts) tracking `job_id` from zero.
    pub fn start_conversion(&mut self, job_id: &str) -> Arc<ProgressSnapshot> {
        let snapshot = Arc::new(ProgressSnapshot::starting());
        self.jobs.insert(
            job_id.to_string(),
            TrackedJob {
                snapshot: Arc::clone(&snapshot),
                start_time: self.clock.now_millis(),
                history: ProgressHistory::new(self.history_window, 0.0),
            },
        );
        snapshot
    }

    /// Applies a progress report and returns the resulting snapshot.
    ///
    /// Unknown jobs are created on the fly, since progress events may arrive
    /// before `start_conversion`. A report identical to the stored one, or
    /// any report for a job that already reached a terminal stage, leaves the
    /// stored snapshot untouched.
    pub fn update_progress(&mut self, job_id: &str, update: ProgressUpdate) -> Arc<ProgressSnapshot> {
        let now = self.clock.now_millis();

        let Some(job) = self.jobs.get_mut(job_id) else {
            let history = ProgressHistory::new(self.history_window, update.percentage);
            let snapshot = Arc::new(update.into_snapshot(None));
            self.jobs.insert(
                job_id.to_string(),
                TrackedJob {
                    snapshot: Arc::clone(&snapshot),
                    start_time: now,
                    history,
                },
            );
            return snapshot;
        };

        if job.snapshot.stage.is_terminal() {
            log::debug!(
                "Ignoring progress for job {} after terminal stage {}",
                job_id,
                job.snapshot.stage.as_str()
            );
            return Arc::clone(&job.snapshot);
        }

        if job.snapshot.matches(&update) {
            return Arc::clone(&job.snapshot);
        }

        let eta = if update.stage.is_terminal() {
            None
        } else {
            estimate_remaining_secs(
                update.percentage,
                now - job.start_time,
                &job.history,
                self.min_eta_total_ms,
            )
        };

        job.history.push(update.percentage);
        job.snapshot = Arc::new(update.into_snapshot(eta));
        Arc::clone(&job.snapshot)
    }

    /// Marks the job completed at 100%. No-op for unknown or terminal jobs.
    pub fn complete_conversion(&mut self, job_id: &str) -> Option<Arc<ProgressSnapshot>> {
        self.finish(job_id, JobStage::Completed, |snapshot| {
            snapshot.percentage = 100.0;
        })
    }

    /// Marks the job failed, keeping its last percentage.
    pub fn fail_conversion(&mut self, job_id: &str, error: &str) -> Option<Arc<ProgressSnapshot>> {
        self.finish(job_id, JobStage::Failed, |snapshot| {
            snapshot.current_operation = error.to_string();
        })
    }

    /// Marks the job cancelled, keeping its last percentage.
    pub fn cancel_conversion(&mut self, job_id: &str) -> Option<Arc<ProgressSnapshot>> {
        self.finish(job_id, JobStage::Cancelled, |snapshot| {
            snapshot.current_operation = "Conversion cancelled".to_string();
        })
    }

    fn finish<F>(&mut self, job_id: &str, stage: JobStage, apply: F) -> Option<Arc<ProgressSnapshot>>
    where
        F: FnOnce(&mut ProgressSnapshot),
    {
        let job = self.jobs.get_mut(job_id)?;
        if job.snapshot.stage.is_terminal() {
            return Some(Arc::clone(&job.snapshot));
        }

        let mut snapshot = ProgressSnapshot::clone(&job.snapshot);
        snapshot.stage = stage;
        snapshot.estimated_time_remaining = None;
        apply(&mut snapshot);

        job.snapshot = Arc::new(snapshot);
        Some(Arc::clone(&job.snapshot))
    }

    /// Stops tracking `job_id`. Returns whether it was tracked.
    pub fn clear_conversion(&mut self, job_id: &str) -> bool {
        self.jobs.remove(job_id).is_some()
    }

    pub fn get_progress(&self, job_id: &str) -> Option<Arc<ProgressSnapshot>> {
        self.jobs.get(job_id).map(|job| Arc::clone(&job.snapshot))
    }

    /// Recent percentage samples for `job_id`, oldest first.
    pub fn history(&self, job_id: &str) -> Option<Vec<f64>> {
        self.jobs.get(job_id).map(|job| job.history.samples())
    }

    pub fn is_tracking(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn tracked_jobs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Feeds one event from the background context into the tracker.
    pub fn apply_event(&mut self, event: &ConversionEvent) {
        match event {
            ConversionEvent::Progress { job_id, progress } => {
                self.update_progress(job_id, progress.clone());
            }
            ConversionEvent::Complete { job_id, .. } => {
                self.complete_conversion(job_id);
            }
            ConversionEvent::Error { job_id, error } => {
                self.fail_conversion(job_id, error);
            }
        }
    }
}
