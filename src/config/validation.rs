//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, queue depth > 0, durations bounded)
//! - Check addresses parse and the meta directory exists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PrerenderConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{
    PrerenderConfig, MAX_CACHE_TTL_SECS, MAX_IDLE_SECS, MAX_SWEEP_INTERVAL_SECS,
};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("{field} is not a socket address: {value}")]
    BadAddress { field: &'static str, value: String },

    #[error("meta.dir is not a directory: {0}")]
    MetaDirMissing(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &PrerenderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.render.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "render.timeout_secs" });
    }
    if config.scheduler.idle_secs == 0 {
        errors.push(ValidationError::Zero { field: "scheduler.idle_secs" });
    }
    if config.scheduler.queue_depth == 0 {
        errors.push(ValidationError::Zero { field: "scheduler.queue_depth" });
    }
    if config.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "cache.sweep_interval_secs" });
    }

    if config.render.cache_ttl_secs > MAX_CACHE_TTL_SECS {
        errors.push(ValidationError::TooLarge {
            field: "render.cache_ttl_secs",
            max: MAX_CACHE_TTL_SECS,
        });
    }
    if config.scheduler.idle_secs > MAX_IDLE_SECS {
        errors.push(ValidationError::TooLarge {
            field: "scheduler.idle_secs",
            max: MAX_IDLE_SECS,
        });
    }
    if config.cache.sweep_interval_secs > MAX_SWEEP_INTERVAL_SECS {
        errors.push(ValidationError::TooLarge {
            field: "cache.sweep_interval_secs",
            max: MAX_SWEEP_INTERVAL_SECS,
        });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if let Some(dir) = &config.meta.dir {
        if !dir.is_dir() {
            errors.push(ValidationError::MetaDirMissing(dir.display().to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
