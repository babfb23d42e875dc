//! Logging configuration
//!
//! Structured logging setup on `tracing`, with an env-filter driven level,
//! stderr output and optional daily-rotated file output.

use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level
    pub level: Level,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            stderr: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            if rust_log.contains("trace") {
                config.level = Level::TRACE;
            } else if rust_log.contains("debug") {
                config.level = Level::DEBUG;
            } else if rust_log.contains("warn") {
                config.level = Level::WARN;
            } else if rust_log.contains("error") {
                config.level = Level::ERROR;
            }
        }

        if let Ok(log_file) = std::env::var("HASS_BRIDGE_LOG_FILE") {
            config.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(log_stderr) = std::env::var("HASS_BRIDGE_LOG_STDERR") {
            config.stderr = log_stderr.to_lowercase() != "false";
        }

        config
    }
}

/// Initialize logging with the given configuration
pub fn init_logging(
    config: LogConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    match config.file_path {
        Some(file_path) => {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let directory = file_path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "hass-mqtt-bridge.log".to_string());
            let appender = tracing_appender::rolling::daily(directory, file_name);

            let builder = fmt()
                .with_env_filter(env_filter)
                .with_writer(appender)
                .with_ansi(false);
            builder.try_init()?;
        }
        None => {
            let builder = fmt().with_env_filter(env_filter);
            if config.stderr {
                builder.with_writer(std::io::stderr).try_init()?;
            } else {
                builder.try_init()?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.file_path.is_none());
        assert!(config.stderr);
    }

    #[test]
    fn test_repeated_init_reports_error() {
        // A global subscriber can only be installed once per process; the
        // second attempt must surface an error rather than panic.
        let _ = init_logging(LogConfig::default());
        let second = init_logging(LogConfig::default());
        assert!(second.is_err());
        // The error crosses thread boundaries
        std::thread::spawn(move || drop(second))
            .join()
            .unwrap();
    }
}
