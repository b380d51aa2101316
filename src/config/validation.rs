use crate::config::types::{
    ApiConfig, ClientConfig, Config, CrawlerConfig, OutputConfig, MIN_PAGE_TOKEN_DELAY_MS,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_client_config(&config.client)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates upstream endpoints and key variable names
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_base_url("places-base-url", &config.places_base_url)?;
    validate_base_url("serper-base-url", &config.serper_base_url)?;

    for (field, value) in [
        ("places-key-env", &config.places_key_env),
        ("serper-key-env", &config.serper_key_env),
    ] {
        validate_env_var_name(field, value)?;
    }

    Ok(())
}

/// Validates crawl behavior configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.country.trim().is_empty() {
        return Err(ConfigError::Validation("country cannot be empty".to_string()));
    }

    validate_category(&config.category)?;

    if let Some(blank) = config.regions.iter().position(|r| r.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "regions[{}] cannot be empty",
            blank
        )));
    }

    if config.page_token_delay_ms < MIN_PAGE_TOKEN_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "page_token_delay_ms must be >= {}ms, got {}ms",
            MIN_PAGE_TOKEN_DELAY_MS, config.page_token_delay_ms
        )));
    }

    if config.max_pages_per_region == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages_per_region must be >= 1 when set".to_string(),
        ));
    }

    if config.max_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and 5, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.region_dir.is_empty() {
        return Err(ConfigError::Validation(
            "region_dir cannot be empty".to_string(),
        ));
    }

    if config.master_path.is_empty() {
        return Err(ConfigError::Validation(
            "master_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a base URL: must parse and use http(s)
fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}

/// Places categories are snake_case identifiers such as "night_club"
fn validate_category(category: &str) -> Result<(), ConfigError> {
    if category.is_empty() {
        return Err(ConfigError::Validation(
            "category cannot be empty".to_string(),
        ));
    }

    if !category
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == ' ')
    {
        return Err(ConfigError::Validation(format!(
            "category must be lowercase letters, digits, spaces or underscores, got '{}'",
            category
        )));
    }

    Ok(())
}

fn validate_env_var_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "{} must be an upper-case environment variable name, got '{}'",
            field, name
        )));
    }

    Ok(())
}
