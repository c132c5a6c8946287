//! # Structured Logging Module
//!
//! Environment-aware structured logging for the recoverability core.
//! Console output for development, JSON output when requested, filtered
//! through `RUST_LOG`/environment defaults.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process.
///
/// Honors `RUST_LOG` when set, otherwise falls back to an
/// environment-appropriate default. Set `RECOVERABILITY_LOG_JSON=1` for
/// JSON output (production log shippers).
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let default_level = default_log_level(&environment);
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let json_output = std::env::var("RECOVERABILITY_LOG_JSON")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let subscriber = tracing_subscriber::registry();
        let result = if json_output {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_ansi(false)
                        .with_filter(filter),
                )
                .try_init()
        } else {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_filter(filter),
                )
                .try_init()
        };

        // A global subscriber may already be set by the hosting process;
        // that is not an error.
        if result.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            json = json_output,
            "🔧 Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("RECOVERABILITY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}
