//! Subscriber setup for hosts embedding the pipeline.

use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::error::LoggingError;

const DEFAULT_LOG_FILTER: &str = "pobatch=info";

#[derive(Debug, Clone, Default)]
pub struct LogConfig<'a> {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"pobatch=debug"`.
    pub filter: Option<&'a str>,
    /// Emit newline-delimited JSON instead of human-readable lines.
    pub json: bool,
}

fn env_filter(config: &LogConfig<'_>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.unwrap_or(DEFAULT_LOG_FILTER)))
}

/// Installs a global stderr subscriber and forwards `log` records to it.
///
/// Fails if a global subscriber or logger was already installed.
pub fn init_logging(config: LogConfig<'_>) -> Result<(), LoggingError> {
    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter(&config)));

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_when_env_unset() {
        let config = LogConfig::default();
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter(&config).to_string(), DEFAULT_LOG_FILTER);
        }
    }

    #[test]
    fn test_custom_filter() {
        let config = LogConfig {
            filter: Some("pobatch=debug"),
            json: true,
        };
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter(&config).to_string(), "pobatch=debug");
        }
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_logging(LogConfig::default());
        assert!(init_logging(LogConfig::default()).is_err());
    }
}
