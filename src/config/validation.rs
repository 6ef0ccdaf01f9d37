//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early. A
//! network without a nickname cannot register, so this is never tolerated.

use super::{CacheBackend, Config};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one [[networks]] block is required")]
    NoNetworks,
    #[error("networks[{0}].hostname is required")]
    MissingHostname(usize),
    #[error("networks[{0}].nickname is required")]
    MissingNickname(usize),
    #[error("networks[{index}].nickname contains whitespace: {nickname:?}")]
    InvalidNickname { index: usize, nickname: String },
    #[error("network name {0:?} is used more than once")]
    DuplicateNetwork(String),
    #[error("events.workers must be at least 1")]
    NoWorkers,
    #[error("plugins.cache_path is required for the redb cache")]
    MissingCachePath,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.networks.is_empty() {
        errors.push(ValidationError::NoNetworks);
    }

    let mut seen = std::collections::HashSet::new();
    for (index, net) in config.networks.iter().enumerate() {
        if net.hostname.trim().is_empty() {
            errors.push(ValidationError::MissingHostname(index));
        }
        if net.nickname.is_empty() {
            errors.push(ValidationError::MissingNickname(index));
        } else if net.nickname.contains(char::is_whitespace) {
            errors.push(ValidationError::InvalidNickname {
                index,
                nickname: net.nickname.clone(),
            });
        }
        if !seen.insert(net.name().to_string()) {
            errors.push(ValidationError::DuplicateNetwork(net.name().to_string()));
        }
    }

    if config.events.workers == 0 {
        errors.push(ValidationError::NoWorkers);
    }

    if config.plugins.cache == CacheBackend::Redb && config.plugins.cache_path.trim().is_empty() {
        errors.push(ValidationError::MissingCachePath);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
