//! `tracing` setup. Everything goes to stderr; stdout carries glyphs and model text.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_ENV: &str = "GLYPHFORGE_LOG";

/// Pick the filter directive: `GLYPHFORGE_LOG`, then `-v` count, then config.
pub fn filter_directive(env_value: Option<&str>, verbose: u8, config: &LoggingConfig) -> String {
    if let Some(v) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return v.to_string();
    }
    match verbose {
        0 => config.filter.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

pub fn init(verbose: u8, config: &LoggingConfig) {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env_value.as_deref(), verbose, config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("warning: invalid log filter '{directive}': {e}");
        EnvFilter::new("warn")
    });

    // A second init (tests driving main paths) is harmless; keep the first.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(filter: &str) -> LoggingConfig {
        LoggingConfig {
            filter: filter.to_string(),
        }
    }

    #[test]
    fn env_wins() {
        assert_eq!(
            filter_directive(Some("gf_backend=trace"), 2, &cfg("warn")),
            "gf_backend=trace"
        );
    }

    #[test]
    fn blank_env_is_ignored() {
        assert_eq!(filter_directive(Some("  "), 1, &cfg("warn")), "info");
    }

    #[test]
    fn verbosity_levels() {
        let c = cfg("error");
        assert_eq!(filter_directive(None, 0, &c), "error");
        assert_eq!(filter_directive(None, 1, &c), "info");
        assert_eq!(filter_directive(None, 2, &c), "debug");
        assert_eq!(filter_directive(None, 3, &c), "trace");
        assert_eq!(filter_directive(None, 9, &c), "trace");
    }

    #[test]
    fn default_config_filter_is_valid() {
        let directive = filter_directive(None, 0, &LoggingConfig::default());
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
