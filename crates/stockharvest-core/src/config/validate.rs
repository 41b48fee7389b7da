//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::output::OutputFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "search.page_size must be > 0".into(),
            ));
        }
        if self.search.max_failures == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_failures must be > 0".into(),
            ));
        }
        if self.search.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "search.request_timeout_ms must be > 0".into(),
            ));
        }
        if self.download.workers == Some(0) {
            return Err(ConfigError::ValidationError(
                "download.workers must be > 0".into(),
            ));
        }
        if self.download.worker_multiplier == 0 {
            return Err(ConfigError::ValidationError(
                "download.worker_multiplier must be > 0".into(),
            ));
        }
        if self.download.fetch_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "download.fetch_timeout_ms must be > 0".into(),
            ));
        }
        if !(self.download.crop_ratio > 0.0 && self.download.crop_ratio <= 1.0) {
            return Err(ConfigError::ValidationError(
                "download.crop_ratio must be in (0.0, 1.0]".into(),
            ));
        }
        if self.download.jpeg_quality == 0 || self.download.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "download.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.output.file_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "output.file_name must not be empty".into(),
            ));
        }
        if OutputFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be \"csv\" or \"jsonl\", got \"{}\"",
                self.output.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.search.page_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.download.workers = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("download.workers"));
    }

    #[test]
    fn test_validate_rejects_invalid_crop_ratio() {
        let mut config = Config::default();
        config.download.crop_ratio = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("crop_ratio"));

        config.download.crop_ratio = 1.2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("crop_ratio"));
    }

    #[test]
    fn test_validate_rejects_invalid_jpeg_quality() {
        let mut config = Config::default();
        config.download.jpeg_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));
    }

    #[test]
    fn test_validate_rejects_unknown_output_format() {
        let mut config = Config::default();
        config.output.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.format"));
    }
}
