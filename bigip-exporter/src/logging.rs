//! Tracing initialization.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{ExporterSettings, LogFormat};

/// Parse a configured log level.
///
/// Accepts the usual tracing levels plus `warning` and `critical`.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" | "critical" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing from the exporter settings.
///
/// `RUST_LOG` wins over the configured level. An unknown level falls back to
/// `info` with a warning.
pub fn init_tracing(settings: &ExporterSettings) -> anyhow::Result<()> {
    let level = parse_level(&settings.log_level);
    let directive = format!(
        "bigip_exporter={level},bigip_client={level},tower_http={level}",
        level = level.unwrap_or(Level::INFO)
    );

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    match settings.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    if level.is_none() {
        tracing::warn!(level = %settings.log_level, "Invalid log level - using info");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("INFO"), Some(Level::INFO));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("critical"), Some(Level::ERROR));
        assert_eq!(parse_level("verbose"), None);
    }
}
