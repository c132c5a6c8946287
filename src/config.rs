//! # Configuration
//!
//! Typed configuration for the recoverability core. Defaults are defined in
//! [`crate::constants::defaults`]; every value can be overridden from the
//! environment with `RECOVERABILITY_`-prefixed variables
//! (e.g. `RECOVERABILITY_DISPATCH__BATCH_SIZE=250`).

use crate::dispatch::dispatch_loop::DispatchLoopSettings;
use crate::error::{RecoverabilityError, Result};
use crate::resilience::CircuitBreakerSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dispatch loop tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub wake_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::constants::defaults::DISPATCH_BATCH_SIZE,
            batch_delay_ms: crate::constants::defaults::DISPATCH_BATCH_DELAY.as_millis() as u64,
            wake_timeout_secs: crate::constants::defaults::DISPATCH_WAKE_TIMEOUT.as_secs(),
        }
    }
}

impl DispatchConfig {
    pub fn to_loop_settings(&self) -> DispatchLoopSettings {
        DispatchLoopSettings {
            batch_size: self.batch_size,
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            wake_timeout: Duration::from_secs(self.wake_timeout_secs),
        }
    }
}

/// Circuit breaker policy for the dispatch loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub failure_window_secs: u64,
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: crate::constants::defaults::CIRCUIT_FAILURE_THRESHOLD,
            failure_window_secs: crate::constants::defaults::CIRCUIT_FAILURE_WINDOW.as_secs(),
            cooldown_secs: crate::constants::defaults::CIRCUIT_COOLDOWN.as_secs(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn to_settings(&self) -> CircuitBreakerSettings {
        CircuitBreakerSettings {
            failure_threshold: self.failure_threshold,
            failure_window: Duration::from_secs(self.failure_window_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}

/// Legacy regrouping sweep tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegroupingConfig {
    pub batch_size: usize,
    pub discovery_chunk_size: usize,
}

impl Default for RegroupingConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::constants::defaults::REGROUPING_BATCH_SIZE,
            discovery_chunk_size: crate::constants::defaults::REGROUPING_DISCOVERY_CHUNK_SIZE,
        }
    }
}

/// Root configuration for the recoverability core
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverabilityConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub regrouping: RegroupingConfig,
}

impl RecoverabilityConfig {
    /// Load configuration: defaults overlaid with `RECOVERABILITY_*`
    /// environment variables (`__` separates nesting levels).
    pub fn from_env() -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default()).map_err(|e| {
            RecoverabilityError::ConfigurationError(format!("invalid defaults: {e}"))
        })?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::Environment::with_prefix("RECOVERABILITY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|merged| merged.try_deserialize::<Self>())
            .map_err(|e| RecoverabilityError::ConfigurationError(e.to_string()))
    }

    /// Validate cross-field constraints before wiring components.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.batch_size == 0 {
            return Err(RecoverabilityError::ConfigurationError(
                "dispatch.batch_size must be at least 1".to_string(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(RecoverabilityError::ConfigurationError(
                "circuit_breaker.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.regrouping.batch_size == 0 {
            return Err(RecoverabilityError::ConfigurationError(
                "regrouping.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RecoverabilityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatch.batch_size, 100);
        assert_eq!(config.regrouping.discovery_chunk_size, 1);
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let mut config = RecoverabilityConfig::default();
        config.dispatch.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn settings_conversions_preserve_durations() {
        let config = RecoverabilityConfig::default();
        let loop_settings = config.dispatch.to_loop_settings();
        assert_eq!(loop_settings.batch_delay, Duration::from_millis(200));
        let breaker = config.circuit_breaker.to_settings();
        assert_eq!(breaker.cooldown, Duration::from_secs(30));
    }
}
