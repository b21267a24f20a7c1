//! Subscriber setup for the binary

use tracing_subscriber::EnvFilter;
use vaultstress_core::{LogFormat, LoggingConfig};

/// Filter directive: `RUST_LOG` wins, then `--verbose`, then the config level
pub fn filter_directive(config: &LoggingConfig, verbose: bool, env: Option<&str>) -> String {
    match env {
        Some(directive) if !directive.trim().is_empty() => directive.to_string(),
        _ if verbose => "debug".to_string(),
        _ => config.level.as_str().to_string(),
    }
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(filter_directive(config, verbose, env.as_deref()))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);

    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))
}
