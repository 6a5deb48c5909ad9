use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    for cookie in &config.cookies {
        if !cookie.contains('=') {
            return Err(ConfigError::Validation(format!(
                "cookie must be of the form name=value, got '{}'",
                cookie
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.admission_poll_ms == 0 {
        return Err(ConfigError::Validation(
            "admission-poll-ms must be > 0".to_string(),
        ));
    }

    if config.page_retry_delay_ms == 0 || config.requeue_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "retry delays must be > 0ms".to_string(),
        ));
    }

    if config.queue_ceiling == Some(0) {
        return Err(ConfigError::Validation(
            "queue-ceiling must be >= 1 when set".to_string(),
        ));
    }

    if config.max_attempts == Some(0) {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1 when set".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.tag_file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "tag-file cannot be empty".to_string(),
        ));
    }

    if config.tag_file.contains('/') || config.tag_file.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "tag-file must be a plain file name, got '{}'",
            config.tag_file
        )));
    }

    Ok(())
}
