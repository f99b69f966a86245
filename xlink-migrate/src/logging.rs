use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over the
/// configured level. Returns false if a subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig {
            level: "debug".to_string(),
        };
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
