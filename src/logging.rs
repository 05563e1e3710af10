//! Tracing setup for the simulator binary.
//!
//! Events always go to stderr so stdout stays free for the JSON report.
//! `ENABLE_FILE_LOGS` adds a daily-rotated copy under `LOG_DIR`.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "./logs";
const LOG_FILE_PREFIX: &str = "mastery-sim.log";

/// Where and how verbosely the simulator logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `adaptive_mastery=debug`.
    pub level: String,
    /// Directory for the rolling file. `None` keeps logging on stderr only.
    pub file_dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            file_dir: None,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `RUST_LOG`, `ENABLE_FILE_LOGS` and `LOG_DIR` through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup("RUST_LOG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

        let file_logs = lookup("ENABLE_FILE_LOGS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        let file_dir = file_logs.then(|| {
            lookup("LOG_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
        });

        Self { level, file_dir }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    }
}

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber. Hold the returned guard for the life of
/// the process or buffered file events are lost.
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let (file_layer, guard) = match settings.file_dir.as_deref().map(open_rolling_file) {
        Some(Ok((writer, guard))) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        Some(Err(err)) => {
            eprintln!("file logging disabled: {err}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(settings.filter())
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn open_rolling_file(dir: &Path) -> std::io::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_info_on_stderr_only() {
        assert_eq!(settings(&[]), LogSettings::default());
        assert_eq!(settings(&[("RUST_LOG", "  ")]).level, "info");
    }

    #[test]
    fn file_logs_need_the_flag() {
        assert!(settings(&[("LOG_DIR", "/tmp/x")]).file_dir.is_none());
        assert!(settings(&[("ENABLE_FILE_LOGS", "no")]).file_dir.is_none());

        let on = settings(&[("ENABLE_FILE_LOGS", "TRUE"), ("RUST_LOG", "debug")]);
        assert_eq!(on.file_dir, Some(PathBuf::from("./logs")));
        assert_eq!(on.level, "debug");

        let custom = settings(&[("ENABLE_FILE_LOGS", "1"), ("LOG_DIR", "/var/log/mastery")]);
        assert_eq!(custom.file_dir, Some(PathBuf::from("/var/log/mastery")));
    }
}
