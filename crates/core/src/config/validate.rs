use super::{types::Config, ConfigError};
use crate::orchestrator::VariationStrategy;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Orchestrator cost and timeouts are positive
/// - Every provider used by a variation strategy is configured
/// - Storage has a signing secret
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let orchestrator = &config.orchestrator;
    if orchestrator.cost_per_scene == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.cost_per_scene must be greater than 0".to_string(),
        ));
    }
    if orchestrator.submit_timeout_secs == 0 || orchestrator.status_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator timeouts must be greater than 0".to_string(),
        ));
    }
    if orchestrator.default_duration_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.default_duration_secs must be greater than 0".to_string(),
        ));
    }

    for strategy in VariationStrategy::ALL {
        if !config.providers.is_configured(strategy.provider()) {
            return Err(ConfigError::ValidationError(format!(
                "providers.{} must be configured (used by the {} variation)",
                strategy.provider(),
                strategy.name()
            )));
        }
    }

    if config.storage.signing_secret.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.signing_secret cannot be empty".to_string(),
        ));
    }
    if config.storage.signed_url_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "storage.signed_url_ttl_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
