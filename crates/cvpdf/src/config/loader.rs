use std::path::Path;

use crate::config::schema::TrackingConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackingConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<TrackingConfig, ConfigError> {
    let config: TrackingConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &TrackingConfig) -> Result<(), ConfigError> {
    if config.checkpoint_key.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "checkpointKey must not be empty".to_string(),
        });
    }

    if config.orphan_threshold_ms <= 0 {
        return Err(ConfigError::Validation {
            message: format!(
                "orphanThresholdMs must be positive, got {}",
                config.orphan_threshold_ms
            ),
        });
    }

    // Velocity needs at least two samples
    if config.history_window < 2 {
        return Err(ConfigError::Validation {
            message: format!(
                "historyWindow must be at least 2, got {}",
                config.history_window
            ),
        });
    }

    if config.min_eta_total_ms < 0 {
        return Err(ConfigError::Validation {
            message: format!(
                "minEtaTotalMs must not be negative, got {}",
                config.min_eta_total_ms
            ),
        });
    }

    if config.event_channel_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "eventChannelCapacity must be positive".to_string(),
        });
    }

    Ok(())
}
