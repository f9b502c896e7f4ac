use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, info_span, warn, Instrument};

use super::engine::{ConversionEngine, ConversionOutput, ConversionRequest, StageReporter};
use crate::broadcast::{ConversionEvent, ConversionEventBroadcaster};
use crate::clock::Clock;
use crate::error::EngineError;
use crate::lifecycle::LifecycleManager;
use crate::progress::{ProgressUpdate, STARTING_OPERATION};
use crate::stage::JobStage;

const DEFAULT_FILENAME: &str = "resume.pdf";

/// Runs conversions in the background context.
///
/// Checkpoints the job at every stage change, and again while a stage runs
/// long, so a live job never looks abandoned after a restart. Streams
/// progress to the UI and clears the checkpoint once the job ends.
pub struct ConversionRunner {
    engine: Arc<dyn ConversionEngine>,
    lifecycle: Arc<LifecycleManager>,
    events: ConversionEventBroadcaster,
    clock: Arc<dyn Clock>,
    /// Jobs currently in `run`, mapped to whether they were cancelled.
    active: Mutex<HashMap<String, bool>>,
}

impl ConversionRunner {
    pub fn new(
        engine: Arc<dyn ConversionEngine>,
        lifecycle: Arc<LifecycleManager>,
        events: ConversionEventBroadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            lifecycle,
            events,
            clock,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn events(&self) -> &ConversionEventBroadcaster {
        &self.events
    }

    /// Converts one request, returning the engine's result.
    ///
    /// A job cancelled while running yields [`EngineError::Cancelled`] and
    /// emits neither a completion nor an error event.
    pub async fn run(&self, request: ConversionRequest) -> Result<ConversionOutput, EngineError> {
        let span = info_span!("conversion", job_id = %request.job_id);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: ConversionRequest) -> Result<ConversionOutput, EngineError> {
        let job_id = request.job_id.as_str();
        let markup = request.checkpoint_markup.then_some(request.tsx.as_str());
        let started = self.clock.now_millis();

        self.active_jobs().insert(job_id.to_string(), false);

        self.lifecycle
            .save_job_checkpoint(job_id, JobStage::Queued, markup)
            .await;
        self.events.progress(
            job_id,
            ProgressUpdate::new(JobStage::Queued, 0.0, STARTING_OPERATION),
        );

        let reporter = CheckpointingReporter {
            runner: self,
            job_id,
            markup,
            refresh_ms: (self.lifecycle.orphan_threshold_ms() / 2).max(1),
            last_saved: Mutex::new((JobStage::Queued, started)),
        };

        let result = self.engine.convert(&request, &reporter).await;
        // Also removes a checkpoint raced in by a report during cancellation
        self.lifecycle.clear_job_checkpoint(job_id).await;

        if self.active_jobs().remove(job_id).unwrap_or(false) {
            info!("Conversion ended after cancellation, outcome discarded");
            return Err(EngineError::Cancelled);
        }

        match result {
            Ok(mut output) => {
                if output.filename.is_empty() {
                    output.filename = request
                        .filename
                        .clone()
                        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
                }
                let duration = (self.clock.now_millis() - started).max(0) as u64;
                info!(
                    filename = %output.filename,
                    file_size = output.pdf_bytes.len(),
                    duration_ms = duration,
                    "Conversion completed"
                );
                self.events.send(ConversionEvent::Complete {
                    job_id: job_id.to_string(),
                    filename: Some(output.filename.clone()),
                    file_size: output.pdf_bytes.len() as u64,
                    duration,
                    pdf_bytes: Some(output.pdf_bytes.clone()),
                });
                Ok(output)
            }
            Err(e) => {
                warn!(error = %e, "Conversion failed");
                self.events.error(job_id, &e.to_string());
                Err(e)
            }
        }
    }

    /// Discards tracking state for a job.
    ///
    /// The engine is not interrupted. If the job is still running, its later
    /// reports are dropped and its outcome is not announced.
    pub async fn cancel(&self, job_id: &str) {
        {
            let mut active = self.active_jobs();
            if let Some(cancelled) = active.get_mut(job_id) {
                *cancelled = true;
            }
        }
        debug!(job_id, "Discarding tracking state for cancelled job");
        self.lifecycle.clear_job_checkpoint(job_id).await;
    }

    /// Returns true while `job_id` is running and has been cancelled.
    pub fn is_cancelled(&self, job_id: &str) -> bool {
        self.active_jobs().get(job_id).copied().unwrap_or(false)
    }

    fn active_jobs(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        match self.active.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Forwards engine progress to the UI and checkpoints the job.
struct CheckpointingReporter<'a> {
    runner: &'a ConversionRunner,
    job_id: &'a str,
    markup: Option<&'a str>,
    /// Same-stage reports re-save once the last write is this old.
    refresh_ms: i64,
    /// Stage and time of the last checkpoint write.
    last_saved: Mutex<(JobStage, i64)>,
}

impl CheckpointingReporter<'_> {
    /// Decides whether a report at `stage` should be checkpointed, and if so
    /// records it as the latest write.
    fn checkpoint_due(&self, stage: JobStage) -> bool {
        let now = self.runner.clock.now_millis();
        let mut last = match self.last_saved.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (last_stage, saved_at) = *last;
        if last_stage == stage && now - saved_at < self.refresh_ms {
            return false;
        }
        *last = (stage, now);
        true
    }
}

#[async_trait]
impl<'a> StageReporter for CheckpointingReporter<'a> {
    async fn report(&self, update: ProgressUpdate) {
        if self.runner.is_cancelled(self.job_id) {
            return;
        }

        let stage = update.stage;
        self.runner.events.progress(self.job_id, update);

        // Terminal stages are never checkpointed; the runner clears instead
        if stage.is_in_progress() && self.checkpoint_due(stage) {
            self.runner
                .lifecycle
                .save_job_checkpoint(self.job_id, stage, self.markup)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::TrackingConfig;
    use crate::store::MemoryStore;

    struct FixedEngine;

    #[async_trait]
    impl ConversionEngine for FixedEngine {
        async fn convert(
            &self,
            _request: &ConversionRequest,
            reporter: &dyn StageReporter,
        ) -> Result<ConversionOutput, EngineError> {
            reporter
                .report(ProgressUpdate::new(JobStage::Parsing, 10.0, "Parsing markup"))
                .await;
            Ok(ConversionOutput {
                filename: String::new(),
                pdf_bytes: b"%PDF-1.7".to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn test_default_filename_and_cleanup() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let lifecycle = Arc::new(LifecycleManager::new(
            store,
            clock.clone(),
            &TrackingConfig::default(),
        ));
        let runner = ConversionRunner::new(
            Arc::new(FixedEngine),
            Arc::clone(&lifecycle),
            ConversionEventBroadcaster::default(),
            clock,
        );

        let output = runner
            .run(ConversionRequest::new("job-1", "<Cv/>"))
            .await
            .unwrap();
        assert_eq!(output.filename, "resume.pdf");
        assert!(lifecycle.checkpoints().load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_clears_checkpoint() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let lifecycle = Arc::new(LifecycleManager::new(
            store,
            clock.clone(),
            &TrackingConfig::default(),
        ));
        lifecycle
            .save_job_checkpoint("job-1", JobStage::Rendering, None)
            .await;
        let runner = ConversionRunner::new(
            Arc::new(FixedEngine),
            Arc::clone(&lifecycle),
            ConversionEventBroadcaster::default(),
            clock,
        );

        runner.cancel("job-1").await;
        assert!(lifecycle.checkpoints().get("job-1").await.unwrap().is_none());
    }

    /// Reports `Rendering` once a second for six minutes.
    struct LongStageEngine {
        lifecycle: Arc<LifecycleManager>,
        clock: Arc<ManualClock>,
        oldest_seen_ms: std::sync::Mutex<i64>,
    }

    #[async_trait]
    impl ConversionEngine for LongStageEngine {
        async fn convert(
            &self,
            request: &ConversionRequest,
            reporter: &dyn StageReporter,
        ) -> Result<ConversionOutput, EngineError> {
            for second in 1..=360 {
                self.clock.advance(1_000);
                let update = ProgressUpdate::new(JobStage::Rendering, 40.0, "Rendering pages")
                    .with_pages(second, 360);
                reporter.report(update).await;

                let checkpoint = self
                    .lifecycle
                    .checkpoints()
                    .get(&request.job_id)
                    .await
                    .unwrap()
                    .unwrap();
                let age = checkpoint.age_millis(self.clock.now_millis());
                let mut oldest = self.oldest_seen_ms.lock().unwrap();
                *oldest = (*oldest).max(age);
            }
            Ok(ConversionOutput {
                filename: String::new(),
                pdf_bytes: b"%PDF-1.7".to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn test_long_stage_refreshes_checkpoint() {
        let clock = Arc::new(ManualClock::new(0));
        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            &TrackingConfig::default(),
        ));
        let engine = Arc::new(LongStageEngine {
            lifecycle: Arc::clone(&lifecycle),
            clock: clock.clone(),
            oldest_seen_ms: std::sync::Mutex::new(0),
        });
        let runner = ConversionRunner::new(
            engine.clone(),
            Arc::clone(&lifecycle),
            ConversionEventBroadcaster::default(),
            clock,
        );

        runner
            .run(ConversionRequest::new("job-1", "<Cv/>"))
            .await
            .unwrap();

        let oldest = *engine.oldest_seen_ms.lock().unwrap();
        assert!(oldest < lifecycle.orphan_threshold_ms() / 2);
    }

    /// Reports `Parsing`, waits to be resumed, then reports `Rendering`.
    struct ParkedEngine {
        parked: Arc<tokio::sync::Notify>,
        resume: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl ConversionEngine for ParkedEngine {
        async fn convert(
            &self,
            _request: &ConversionRequest,
            reporter: &dyn StageReporter,
        ) -> Result<ConversionOutput, EngineError> {
            reporter
                .report(ProgressUpdate::new(JobStage::Parsing, 10.0, "Parsing markup"))
                .await;
            self.parked.notify_one();
            self.resume.notified().await;
            reporter
                .report(ProgressUpdate::new(JobStage::Rendering, 50.0, "Rendering pages"))
                .await;
            Ok(ConversionOutput {
                filename: String::new(),
                pdf_bytes: b"%PDF-1.7".to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn test_cancel_during_run_discards_job() {
        let clock = Arc::new(ManualClock::new(0));
        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            &TrackingConfig::default(),
        ));
        let parked = Arc::new(tokio::sync::Notify::new());
        let resume = Arc::new(tokio::sync::Notify::new());
        let runner = ConversionRunner::new(
            Arc::new(ParkedEngine {
                parked: Arc::clone(&parked),
                resume: Arc::clone(&resume),
            }),
            Arc::clone(&lifecycle),
            ConversionEventBroadcaster::default(),
            clock,
        );
        let mut events = runner.events().subscribe();

        let (result, _) = tokio::join!(runner.run(ConversionRequest::new("job-1", "<Cv/>")), async {
            parked.notified().await;
            runner.cancel("job-1").await;
            assert!(runner.is_cancelled("job-1"));
            resume.notify_one();
        });

        assert_eq!(result.unwrap_err(), EngineError::Cancelled);
        assert!(!runner.is_cancelled("job-1"));
        assert!(lifecycle.checkpoints().get("job-1").await.unwrap().is_none());

        // Queued and Parsing only; nothing after the cancel
        let mut received = 0;
        while let Ok(event) = events.try_recv() {
            assert!(matches!(event, ConversionEvent::Progress { .. }));
            received += 1;
        }
        assert_eq!(received, 2);
    }
}
