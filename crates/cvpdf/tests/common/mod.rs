//! Shared fixtures for cvpdf integration tests.
//!
//! Engines here stand in for the external markup renderer: they report a
//! fixed sequence of stages and either produce bytes, fail, or hang.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use cvpdf::clock::ManualClock;
use cvpdf::conversion::{ConversionEngine, ConversionOutput, ConversionRequest, StageReporter};
use cvpdf::{
    ConversionEventBroadcaster, ConversionRunner, DurableStore, EngineError, JobCheckpoint,
    JobStage, LifecycleManager, ProgressUpdate, TrackingConfig,
};

pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Stages a healthy conversion walks through, with their percentages.
pub const HAPPY_PATH: &[(JobStage, f64, &str)] = &[
    (JobStage::Parsing, 10.0, "Parsing markup"),
    (JobStage::ExtractingMetadata, 20.0, "Reading document metadata"),
    (JobStage::Rendering, 45.0, "Rendering page 1 of 2"),
    (JobStage::Rendering, 60.0, "Rendering page 2 of 2"),
    (JobStage::LayingOut, 75.0, "Laying out pages"),
    (JobStage::Optimizing, 85.0, "Compressing images"),
    (JobStage::GeneratingPdf, 95.0, "Writing PDF"),
];

/// Engine that reports `HAPPY_PATH` and records the persisted checkpoint
/// after every report.
pub struct ScriptedEngine {
    pub lifecycle: Arc<LifecycleManager>,
    pub clock: Arc<ManualClock>,
    pub step_millis: i64,
    pub seen: Mutex<Vec<Option<JobCheckpoint>>>,
}

impl ScriptedEngine {
    pub fn new(lifecycle: Arc<LifecycleManager>, clock: Arc<ManualClock>) -> Self {
        Self {
            lifecycle,
            clock,
            step_millis: 500,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_stages(&self) -> Vec<Option<JobStage>> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|cp| cp.as_ref().map(|cp| cp.status))
            .collect()
    }
}

#[async_trait]
impl ConversionEngine for ScriptedEngine {
    async fn convert(
        &self,
        request: &ConversionRequest,
        reporter: &dyn StageReporter,
    ) -> Result<ConversionOutput, EngineError> {
        for (stage, percentage, operation) in HAPPY_PATH {
            self.clock.advance(self.step_millis);
            reporter
                .report(ProgressUpdate::new(*stage, *percentage, operation).with_pages(1, 2))
                .await;
            let checkpoint = self
                .lifecycle
                .checkpoints()
                .get(&request.job_id)
                .await
                .unwrap();
            self.seen.lock().unwrap().push(checkpoint);
        }
        Ok(ConversionOutput {
            filename: String::new(),
            pdf_bytes: b"%PDF-1.7\n%%EOF".to_vec(),
        })
    }
}

/// Engine that parses, then rejects the markup.
pub struct FailingEngine;

#[async_trait]
impl ConversionEngine for FailingEngine {
    async fn convert(
        &self,
        _request: &ConversionRequest,
        reporter: &dyn StageReporter,
    ) -> Result<ConversionOutput, EngineError> {
        reporter
            .report(ProgressUpdate::new(JobStage::Parsing, 10.0, "Parsing markup"))
            .await;
        Err(EngineError::Parse("unexpected token '<' at 3:14".to_string()))
    }
}

/// Engine that reaches `Rendering` and never returns, like a background
/// context torn down mid-job.
pub struct HangingEngine {
    pub reached: Arc<Notify>,
}

#[async_trait]
impl ConversionEngine for HangingEngine {
    async fn convert(
        &self,
        _request: &ConversionRequest,
        reporter: &dyn StageReporter,
    ) -> Result<ConversionOutput, EngineError> {
        reporter
            .report(ProgressUpdate::new(JobStage::Rendering, 40.0, "Rendering pages"))
            .await;
        self.reached.notify_one();
        std::future::pending().await
    }
}

/// Engine that stays in `Rendering` for six minutes of clock time, one
/// report a second, then hangs.
pub struct SlowRenderEngine {
    pub clock: Arc<ManualClock>,
    pub reached: Arc<Notify>,
}

#[async_trait]
impl ConversionEngine for SlowRenderEngine {
    async fn convert(
        &self,
        _request: &ConversionRequest,
        reporter: &dyn StageReporter,
    ) -> Result<ConversionOutput, EngineError> {
        for page in 1..=360 {
            self.clock.advance(1_000);
            reporter
                .report(
                    ProgressUpdate::new(JobStage::Rendering, 40.0, "Rendering pages")
                        .with_pages(page, 360),
                )
                .await;
        }
        self.reached.notify_one();
        std::future::pending().await
    }
}

/// Engine that reports `Parsing`, waits for `resume`, then renders and
/// succeeds.
pub struct ParkedEngine {
    pub parked: Arc<Notify>,
    pub resume: Arc<Notify>,
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
            pdf_bytes: b"%PDF-1.7\n%%EOF".to_vec(),
        })
    }
}

pub fn lifecycle(store: Arc<dyn DurableStore>, clock: Arc<ManualClock>) -> Arc<LifecycleManager> {
    Arc::new(LifecycleManager::new(store, clock, &TrackingConfig::default()))
}

pub fn runner(
    engine: Arc<dyn ConversionEngine>,
    lifecycle: Arc<LifecycleManager>,
    clock: Arc<ManualClock>,
) -> ConversionRunner {
    ConversionRunner::new(engine, lifecycle, ConversionEventBroadcaster::default(), clock)
}
