use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Headroom a lease needs past the optimizer timeout for the two status writes.
const STATUS_WRITE_HEADROOM_SECS: u64 = 30;

/// Validate configuration
///
/// Rejects settings the process cannot run with:
/// - `server.port` of 0
/// - `auth.method = "api_key"` without a key
/// - an enabled worker without `optimizer.url`
/// - zero worker concurrency, optimizer timeout or visibility timeout
/// - a visibility timeout that does not outlast the optimizer timeout by more
///   than 30 seconds
/// - an empty list of accepted locator schemes
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key is required when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.worker.enabled && config.optimizer.url.as_deref().is_none_or(str::is_empty) {
        return Err(ConfigError::ValidationError(
            "optimizer.url is required when worker.enabled = true".to_string(),
        ));
    }

    if config.worker.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "worker.concurrency cannot be 0".to_string(),
        ));
    }

    if config.optimizer.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "optimizer.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.queue.visibility_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "queue.visibility_timeout_secs cannot be 0".to_string(),
        ));
    }

    let min_visibility = config
        .optimizer
        .timeout_secs
        .saturating_add(STATUS_WRITE_HEADROOM_SECS);
    if config.queue.visibility_timeout_secs <= min_visibility {
        return Err(ConfigError::ValidationError(format!(
            "queue.visibility_timeout_secs ({}) must exceed optimizer.timeout_secs ({}) by more than {}s",
            config.queue.visibility_timeout_secs,
            config.optimizer.timeout_secs,
            STATUS_WRITE_HEADROOM_SECS
        )));
    }

    if config.submission.schemes.iter().all(|s| s.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "submission.schemes must list at least one scheme".to_string(),
        ));
    }

    Ok(())
}
