use crate::config::types::{
    Config, OutputConfig, PlatformEntry, ProxyConfig, ScraperConfig, UserAgentConfig,
};
use crate::platform::KNOWN_PLATFORMS;
use crate::proxy::ProxyCredential;
use crate::url::page_url;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_proxy_config(&config.proxy)?;
    validate_platforms(&config.platforms)?;
    Ok(())
}

/// Validates scraping limits and timeouts
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    let at_least_one = [
        ("max-attempts", config.max_attempts as u64),
        ("request-timeout-secs", config.request_timeout_secs),
        ("detail-timeout-secs", config.detail_timeout_secs),
        ("per-candidate-budget-secs", config.per_candidate_budget_secs),
    ];
    for (name, value) in at_least_one {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if let Some(name) = &config.combined_file {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "combined-file must be a plain file name, got '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Proxy settings only matter when the pool is enabled
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    Url::parse(&config.api_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy api-url: {}", e)))?;

    if config.count < 1 {
        return Err(ConfigError::Validation(format!(
            "proxy count must be >= 1, got {}",
            config.count
        )));
    }

    if let Some(fallback) = &config.fallback {
        if ProxyCredential::parse(fallback).is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Invalid fallback proxy '{}'",
                fallback
            )));
        }
    }

    Ok(())
}

/// Validates platform selections and listing URL templates
fn validate_platforms(entries: &[PlatformEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        if !KNOWN_PLATFORMS.contains(&entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown platform '{}' (known: {})",
                entry.name,
                KNOWN_PLATFORMS.join(", ")
            )));
        }

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Platform '{}' is configured more than once",
                entry.name
            )));
        }

        if let Some(template) = &entry.list_url {
            validate_list_url(template)?;
        }
    }

    Ok(())
}

/// A listing URL template must contain `{page}` and expand to a valid URL
fn validate_list_url(template: &str) -> Result<(), ConfigError> {
    if !template.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "list-url '{}' must contain a {{page}} placeholder",
            template
        )));
    }

    Url::parse(&page_url(template, 1))
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid list-url '{}': {}", template, e)))?;

    Ok(())
}
