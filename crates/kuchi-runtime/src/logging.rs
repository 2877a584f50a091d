//! Subscriber setup
//!
//! `KUCHI_LOG` takes an `EnvFilter` directive (`kuchi_runtime=debug,info`)
//! and wins over the configured level.

use tracing_subscriber::EnvFilter;

use kuchi_core::{KuchiError, KuchiResult, LoggingConfig};

pub const LOG_ENV: &str = "KUCHI_LOG";

/// Filter from `KUCHI_LOG`, else from the configured level
pub fn filter(config: &LoggingConfig) -> KuchiResult<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| KuchiError::Config(format!("log level {:?}: {e}", config.level))),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> KuchiResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config)?)
        .with_target(true);

    let installed = if config.json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| KuchiError::Config(format!("logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_level_is_config_error() {
        if std::env::var_os(LOG_ENV).is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "info,kuchi=notalevel".into(),
            json: false,
        };
        assert!(filter(&config).is_err());
    }

    #[test]
    fn test_default_level_parses() {
        assert!(filter(&LoggingConfig::default()).is_ok());
    }
}
