//! # Structured Logging
//!
//! Installs the process-wide `tracing` subscriber. `RUST_LOG` wins when set;
//! otherwise the configured level applies to this crate and to `tower_http`.

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::config::{LogFormat, LoggingConfig};

/// Filter used when `RUST_LOG` is unset
pub fn default_directives(level: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };
    format!("berth_apiserver={},tower_http={}", level, level)
}

/// Install the subscriber. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let result = match config.format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    if result.is_err() {
        warn!("tracing subscriber already initialized, skipping");
        return;
    }

    info!(format = ?config.format, level = %config.level, "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives("info"), "berth_apiserver=info,tower_http=info");
        assert_eq!(default_directives("DEBUG"), "berth_apiserver=debug,tower_http=debug");
        assert_eq!(default_directives("verbose"), "berth_apiserver=info,tower_http=info");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
