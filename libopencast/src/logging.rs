//! Logging setup for the OpenCast binary
//!
//! Output always goes to stderr so stdout stays clean for generated content
//! and JSON reports.
//!
//! # Examples
//!
//! ```no_run
//! use libopencast::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(LogFormat::Json, "info".to_string(), false);
//! config.init();
//! ```

use std::str::FromStr;

use crate::config::LogSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text without target names
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line with colors, for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Build from the `[logging]` section, letting the environment win
    ///
    /// An unrecognised format in the file falls back to text.
    pub fn from_settings<F>(settings: &LogSettings, verbose: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = lookup("OPENCAST_LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .or_else(|| settings.format.parse().ok())
            .unwrap_or(LogFormat::Text);
        let level = lookup("OPENCAST_LOG_LEVEL").unwrap_or_else(|| settings.level.clone());
        Self::new(format, level, verbose)
    }

    /// Install the global subscriber. Later calls are ignored.
    pub fn init(&self) {
        use tracing_subscriber::EnvFilter;

        let default_level = if self.verbose { "debug" } else { self.level.as_str() };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        let result = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .try_init(),
        };

        if result.is_err() {
            tracing::debug!("Logging already initialized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("yaml"
            .parse::<LogFormat>()
            .unwrap_err()
            .contains("Invalid log format: 'yaml'"));
    }

    #[test]
    fn test_from_settings_uses_file_values() {
        let settings = LogSettings {
            level: "warn".to_string(),
            format: "json".to_string(),
        };
        let config = LoggingConfig::from_settings(&settings, false, |_| None);
        assert_eq!(config, LoggingConfig::new(LogFormat::Json, "warn".to_string(), false));
    }

    #[test]
    fn test_from_settings_environment_wins() {
        let settings = LogSettings::default();
        let config = LoggingConfig::from_settings(&settings, true, |key| match key {
            "OPENCAST_LOG_FORMAT" => Some("pretty".to_string()),
            "OPENCAST_LOG_LEVEL" => Some("trace".to_string()),
            _ => None,
        });
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "trace");
        assert!(config.verbose);
    }

    #[test]
    fn test_from_settings_bad_format_falls_back_to_text() {
        let settings = LogSettings {
            level: "info".to_string(),
            format: "xml".to_string(),
        };
        let config = LoggingConfig::from_settings(&settings, false, |_| None);
        assert_eq!(config.format, LogFormat::Text);
    }
}
