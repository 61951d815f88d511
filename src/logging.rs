use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DebugConfig;

/// Filter directive for the subscriber: `RUST_LOG` when set, else the configured level.
pub fn filter_for(config: &DebugConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.trim()))
        .unwrap_or_else(|_| "info".into())
}

/// Install the global subscriber. A second call leaves the first subscriber in place.
pub fn init_logging(config: &DebugConfig) -> Result<()> {
    let installed = tracing_subscriber::registry()
        .with(filter_for(config))
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    match installed {
        Ok(()) => Ok(()),
        Err(e) if config.enabled => Err(eyre!("Failed to install log subscriber: {}", e)),
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        let config = DebugConfig::default();
        init_logging(&config).unwrap();
        init_logging(&config).unwrap();
    }
}
