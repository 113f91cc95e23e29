/// Bridge configuration
///
/// Plain data with sensible defaults; `from_env()` overlays the few settings
/// that are commonly changed without recompiling (log level and log file).

use std::path::PathBuf;
use std::time::Duration;
use crate::log::LogSeverity;

/// Environment variable selecting the minimum log severity
pub const LOG_LEVEL_ENV: &str = "RETRO3D_LOG_LEVEL";

/// Environment variable selecting a log file (replaces console output)
pub const LOG_FILE_ENV: &str = "RETRO3D_LOG_FILE";

/// Configuration for a [`Device`](crate::device::Device) and its worker thread
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Application name (only used in log messages)
    pub app_name: String,
    /// Minimum severity forwarded to the logger
    pub log_level: LogSeverity,
    /// When set, `Engine::apply_config` installs a `FileLogger` on this path
    pub log_file: Option<PathBuf>,
    /// Name given to the driver worker thread
    pub worker_thread_name: String,
    /// Stack size of the driver worker thread in bytes
    pub worker_stack_size: usize,
    /// How long `CommandQueue::shutdown` waits for the worker to drain and exit
    pub shutdown_timeout: Duration,
    /// Sleep between polls while spin-waiting on pending buffer updates
    pub pending_poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            app_name: "Retro3D Application".to_string(),
            log_level: LogSeverity::Info,
            log_file: None,
            worker_thread_name: "retro3d-driver".to_string(),
            worker_stack_size: 1024 * 1024,
            shutdown_timeout: Duration::from_millis(5000),
            pending_poll_interval: Duration::from_millis(1),
        }
    }
}

impl BridgeConfig {
    /// Default configuration with `RETRO3D_LOG_LEVEL` / `RETRO3D_LOG_FILE` applied
    ///
    /// Unparseable log levels are ignored.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(
            std::env::var(LOG_LEVEL_ENV).ok().as_deref(),
            std::env::var(LOG_FILE_ENV).ok().as_deref(),
        )
    }

    /// Apply already-read override values (split out so it can be tested
    /// without touching the process environment)
    pub fn with_env_overrides(mut self, log_level: Option<&str>, log_file: Option<&str>) -> Self {
        if let Some(level) = log_level.and_then(LogSeverity::parse) {
            self.log_level = level;
        }
        if let Some(file) = log_file.filter(|f| !f.trim().is_empty()) {
            self.log_file = Some(PathBuf::from(file));
        }
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
