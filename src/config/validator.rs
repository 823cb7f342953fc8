use crate::config::Config;
use crate::error::{FolioError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_engine(config, &mut errors);
        Self::validate_ranking(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_evaluation(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FolioError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_engine(config: &Config, errors: &mut Vec<ValidationError>) {
        let url = &config.engine.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "engine.url",
                format!("URL must start with http:// or https://, got '{}'", url),
            ));
        }

        if config.engine.index.trim().is_empty() {
            errors.push(ValidationError::new(
                "engine.index",
                "Index name cannot be empty",
            ));
        }

        if config.engine.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "engine.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if config.engine.result_size == 0 {
            errors.push(ValidationError::new(
                "engine.result_size",
                "Result size must be greater than 0",
            ));
        }

        if config.engine.inner_hits == 0 {
            errors.push(ValidationError::new(
                "engine.inner_hits",
                "Inner hit count must be greater than 0",
            ));
        }

        if !config.engine.cover_url_template.contains("{book_id}") {
            errors.push(ValidationError::new(
                "engine.cover_url_template",
                "Template must contain the {book_id} placeholder",
            ));
        }
    }

    fn validate_ranking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.ranking.max_per_category == 0 {
            errors.push(ValidationError::new(
                "ranking.max_per_category",
                "Category cap must be greater than 0",
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        if config.storage.history_cap == 0 {
            errors.push(ValidationError::new(
                "storage.history_cap",
                "History cap must be greater than 0",
            ));
        }
    }

    fn validate_evaluation(config: &Config, errors: &mut Vec<ValidationError>) {
        let threshold = config.evaluation.pass_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            errors.push(ValidationError::new(
                "evaluation.pass_threshold",
                format!("Pass threshold must be between 0 and 100, got {}", threshold),
            ));
        }
    }
}
