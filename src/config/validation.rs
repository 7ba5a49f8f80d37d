use crate::config::types::{
    CategoryEntry, Config, HarvesterConfig, OutputConfig, RetryConfig, SourceConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_retry_config(&config.retry)?;
    validate_source_config(&config.source)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates pacing and admission settings
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.min_request_delay_ms > config.max_request_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_request_delay_ms ({}) must not exceed max_request_delay_ms ({})",
            config.min_request_delay_ms, config.max_request_delay_ms
        )));
    }

    if !config.error_delay_factor.is_finite() || config.error_delay_factor < 0.0 {
        return Err(ConfigError::Validation(format!(
            "error_delay_factor must be a non-negative number, got {}",
            config.error_delay_factor
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates the remote catalog layout
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.list_path.contains("{list}") {
        return Err(ConfigError::Validation(format!(
            "list_path '{}' must contain the {{list}} placeholder",
            config.list_path
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page_size must be >= 1".to_string(),
        ));
    }

    if config.max_pages_per_category < 1 {
        return Err(ConfigError::Validation(
            "max_pages_per_category must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.browser_string.trim().is_empty() {
        return Err(ConfigError::Validation(
            "browser_string cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    if config.final_path.is_empty() {
        return Err(ConfigError::Validation(
            "final_path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path == config.final_path {
        return Err(ConfigError::Validation(
            "checkpoint_path and final_path must differ".to_string(),
        ));
    }

    if config.checkpoint_interval < 1 || config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval and progress_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the category table
fn validate_categories(categories: &[CategoryEntry]) -> Result<(), ConfigError> {
    if categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[category]] is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for entry in categories {
        if entry.name.trim().is_empty() || entry.list_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name and list-id cannot be empty".to_string(),
            ));
        }

        if entry.quota < 1 {
            return Err(ConfigError::Validation(format!(
                "Category '{}' must have a quota >= 1",
                entry.name
            )));
        }

        if !names.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Category '{}' is listed more than once",
                entry.name
            )));
        }
    }

    Ok(())
}
