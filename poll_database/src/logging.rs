//! Logging setup for the simulation binary.
//!
//! Logs go to stderr so stdout carries only the report lines.

use std::io;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub enable_ansi: bool,
    /// Overrides both `level` and `RUST_LOG` when set
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            enable_ansi: true,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn without_ansi(mut self) -> Self {
        self.enable_ansi = false;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter directives in effect: explicit filter, then `RUST_LOG`, then
    /// `level` for this workspace's crates.
    pub fn filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
        if let Some(filter) = &self.env_filter {
            return EnvFilter::try_new(filter);
        }
        Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},des={level}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level = self.level
            ))
        }))
    }

    /// Install the global subscriber. Fails if one is already set.
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(self.enable_ansi)
            .with_target(false);

        tracing_subscriber::registry()
            .with(self.filter()?)
            .with(layer)
            .try_init()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = LoggingConfig::new()
            .with_level(Level::DEBUG)
            .without_ansi()
            .with_env_filter("poll_database=trace");
        assert_eq!(config.level, Level::DEBUG);
        assert!(!config.enable_ansi);
        assert_eq!(config.env_filter.as_deref(), Some("poll_database=trace"));
    }

    #[test]
    fn test_explicit_filter_is_used() {
        let config = LoggingConfig::new().with_env_filter("poll_database=debug");
        assert!(config.filter().is_ok());
    }
}
