pub mod broadcast;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod conversion;
pub mod error;
pub mod job_id;
pub mod lifecycle;
pub mod logging;
pub mod progress;
pub mod stage;
pub mod store;

pub use broadcast::{spawn_progress_listener, ConversionEvent, ConversionEventBroadcaster};
pub use checkpoint::{CheckpointMap, CheckpointStore, JobCheckpoint};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, TrackingConfig};
pub use conversion::{ConversionEngine, ConversionRequest, ConversionRunner, StageReporter};
pub use error::{
    CheckpointError, ConfigError, CvpdfError, EngineError, Result, StoreError,
};
pub use job_id::new_job_id;
pub use lifecycle::{LifecycleEvent, LifecycleManager, LifecycleSignals, StartupReport};
pub use logging::{init_logging, LogFormat};
pub use progress::{ProgressSnapshot, ProgressTracker, ProgressUpdate};
pub use stage::JobStage;
pub use store::{DurableStore, MemoryStore, SqliteStore};
