//! Background-side orchestration of a conversion job.

pub mod engine;
pub mod runner;

pub use engine::{ConversionEngine, ConversionOutput, ConversionRequest, StageReporter};
pub use runner::ConversionRunner;
