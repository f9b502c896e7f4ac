//! Process-wide log output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Returns `false`
/// when a subscriber was already installed; nothing changes in that case.
pub fn init_logging(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (text, json) = match format {
        LogFormat::Text => (Some(fmt::layer().with_target(true)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(true))),
    };

    let subscriber = Registry::default().with(filter).with(text).with(json);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!("log bridge already installed: {}", e);
    }
    true
}
