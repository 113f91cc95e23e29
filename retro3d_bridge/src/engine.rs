/// Retro3D Engine - global logging facade
///
/// The only process-wide state of the bridge lives here: the installed
/// logger and the minimum severity filter. Command queues and devices are
/// never global; every resource holds an explicit device handle instead.

use std::sync::{OnceLock, RwLock};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::SystemTime;
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, FileLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Minimum severity forwarded to the logger (everything passes until configured)
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Trace as u8);

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

// ===== PUBLIC API =====

/// Logging entry point used by the `engine_*` macros
///
/// # Example
///
/// ```no_run
/// use retro3d_bridge::retro3d::{Engine, BridgeConfig};
///
/// Engine::apply_config(&BridgeConfig::from_env())?;
/// # Ok::<(), retro3d_bridge::retro3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Apply the logging part of a configuration
    ///
    /// Sets the minimum severity and, when `log_file` is set, replaces the
    /// current logger with a `FileLogger`.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the log file cannot be opened; the
    /// severity filter is applied regardless.
    pub fn apply_config(config: &BridgeConfig) -> Result<()> {
        Self::set_log_level(config.log_level);

        if let Some(path) = &config.log_file {
            let logger = FileLogger::open(path).map_err(|e| {
                crate::engine_error!("retro3d::Engine", "Failed to open log file {}: {}", path.display(), e);
                Error::InitializationFailed(format!("Failed to open log file {}: {}", path.display(), e))
            })?;
            Self::set_logger(logger);
        }

        crate::engine_debug!("retro3d::Engine", "Logging configured for '{}' (level {:?})",
            config.app_name, config.log_level);
        Ok(())
    }

    /// Replace the global logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use retro3d_bridge::retro3d::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct QuietLogger;
    /// impl Logger for QuietLogger {
    ///     fn log(&self, _entry: &LogEntry) {}
    /// }
    ///
    /// Engine::set_logger(QuietLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Set the minimum severity forwarded to the logger
    pub fn set_log_level(level: LogSeverity) {
        MIN_SEVERITY.store(level as u8, Ordering::Relaxed);
    }

    /// Current minimum severity
    pub fn log_level() -> LogSeverity {
        LogSeverity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Whether an entry of `severity` would reach the logger
    pub fn is_enabled(severity: LogSeverity) -> bool {
        severity >= Self::log_level()
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level
    /// * `source` - Source module (e.g., "retro3d::CommandQueue")
    /// * `message` - Log message
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if !Self::is_enabled(severity) {
            return;
        }
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if !Self::is_enabled(severity) {
            return;
        }
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
