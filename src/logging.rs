use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "trainer.log";
const DEFAULT_LOG_DIR: &str = "./logs";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env(level: &str) -> Self {
        let file_dir = file_logging_enabled().then(|| {
            std::env::var("LOG_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into()
        });

        Self {
            level: level.to_string(),
            file_dir,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Installs the global subscriber: stdout always, plus a daily rolling file
/// when a log directory is configured and can be created.
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let stdout_layer = fmt::layer().with_target(true);

    let file_target = settings.file_dir.as_ref().and_then(|dir| {
        match std::fs::create_dir_all(dir) {
            Ok(()) => Some(dir),
            Err(err) => {
                eprintln!("failed to create log directory {}: {err}", dir.display());
                None
            }
        }
    });

    let (file_layer, guard) = match file_target {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_uses_configured_level() {
        let settings = LogSettings {
            level: "debug".to_string(),
            file_dir: None,
        };
        assert_eq!(settings.env_filter().to_string(), "debug");
    }
}
