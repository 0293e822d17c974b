//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_mb == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_mb must be > 0".into(),
            ));
        }
        if self.server.max_in_flight == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_in_flight must be > 0".into(),
            ));
        }
        if self.processing.max_target_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "processing.max_target_dimension must be > 0".into(),
            ));
        }
        let [height, width] = self.processing.default_size;
        if height == 0
            || width == 0
            || height > self.processing.max_target_dimension
            || width > self.processing.max_target_dimension
        {
            return Err(ConfigError::ValidationError(format!(
                "processing.default_size must be within 1..={}",
                self.processing.max_target_dimension
            )));
        }
        if !(1..=100).contains(&self.processing.original_quality) {
            return Err(ConfigError::ValidationError(
                "processing.original_quality must be between 1 and 100".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.process_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.process_timeout_ms must be > 0".into(),
            ));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.bucket must not be empty".into(),
            ));
        }
        if self.storage.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "storage.timeout_ms must be > 0".into(),
            ));
        }
        if self.storage.memory_max_objects == 0 {
            return Err(ConfigError::ValidationError(
                "storage.memory_max_objects must be > 0".into(),
            ));
        }
        if self.storage.signed_url_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "storage.signed_url_ttl_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}
