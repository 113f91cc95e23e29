//! Internal logging system for the Retro3D bridge
//!
//! This module provides a flexible logging system with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Fixme, Error)
//! - Colored console output by default
//! - Plain-text file output and a `log` crate bridge
//! - File and line information for detailed ERROR logs
//!
//! `Fixme` sits between `Warn` and `Error`: it reports legacy API behavior that
//! is tolerated but not implemented (unknown lock flags, priority stubs, ...).

use colored::*;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to create custom loggers (network logging, test capture, etc.)
///
/// # Example
///
/// ```no_run
/// use retro3d_bridge::retro3d::log::{Logger, LogEntry};
///
/// struct CountingLogger;
///
/// impl Logger for CountingLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Count or forward the entry...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    ///
    /// # Arguments
    ///
    /// * `entry` - The log entry to process
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "retro3d::CommandQueue", "retro3d::Buffer")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose information (every executed command)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Rejected calls and potential issues
    Warn,

    /// Tolerated but unimplemented legacy behavior
    Fixme,

    /// Error messages (critical issues with file:line details)
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the console and file loggers
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Fixme => "FIXME",
            LogSeverity::Error => "ERROR",
        }
    }

    /// Parse a severity name (case-insensitive), as found in `RETRO3D_LOG_LEVEL`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogSeverity::Trace),
            "debug" => Some(LogSeverity::Debug),
            "info" => Some(LogSeverity::Info),
            "warn" | "warning" => Some(LogSeverity::Warn),
            "fixme" => Some(LogSeverity::Fixme),
            "error" | "err" => Some(LogSeverity::Error),
            _ => None,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => LogSeverity::Trace,
            1 => LogSeverity::Debug,
            2 => LogSeverity::Info,
            3 => LogSeverity::Warn,
            4 => LogSeverity::Fixme,
            _ => LogSeverity::Error,
        }
    }
}

fn format_timestamp(timestamp: SystemTime) -> String {
    let datetime: DateTime<Local> = timestamp.into();
    datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Default logger implementation using colored console output
///
/// Colors:
/// - Trace: bright black
/// - Debug: cyan
/// - Info: green
/// - Warn: yellow
/// - Fixme: magenta
/// - Error: bold red
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let timestamp = format_timestamp(entry.timestamp);

        let severity_str = match entry.severity {
            LogSeverity::Trace => entry.severity.label().bright_black(),
            LogSeverity::Debug => entry.severity.label().cyan(),
            LogSeverity::Info => entry.severity.label().green(),
            LogSeverity::Warn => entry.severity.label().yellow(),
            LogSeverity::Fixme => entry.severity.label().magenta(),
            LogSeverity::Error => entry.severity.label().red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp,
                severity_str,
                source,
                entry.message,
                file,
                line
            );
        } else {
            println!(
                "[{}] [{}] [{}] {}",
                timestamp,
                severity_str,
                source,
                entry.message
            );
        }
    }
}

/// Logger appending uncolored lines to a file
///
/// Every entry is flushed immediately so that a crash on the worker thread
/// still leaves the preceding lines on disk.
pub struct FileLogger {
    file: Mutex<File>,
}

impl FileLogger {
    /// Open (or create) `path` in append mode
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl Logger for FileLogger {
    fn log(&self, entry: &LogEntry) {
        let timestamp = format_timestamp(entry.timestamp);
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");

        let line = match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] [{}] {} ({}:{})\n",
                timestamp, entry.severity.label(), thread_name, entry.source, entry.message, file, line
            ),
            _ => format!(
                "[{}] [{}] [{}] [{}] {}\n",
                timestamp, entry.severity.label(), thread_name, entry.source, entry.message
            ),
        };

        // A poisoned file lock only means another thread panicked mid-write
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = file.write_all(line.as_bytes());
        let _ = file.flush();
    }
}

/// Logger forwarding entries to the `log` crate facade
///
/// Lets hosts that already run `env_logger` (or any other `log` backend)
/// receive bridge messages. `Fixme` maps to `log::Level::Warn`.
pub struct LogFacadeLogger;

impl Logger for LogFacadeLogger {
    fn log(&self, entry: &LogEntry) {
        let level = match entry.severity {
            LogSeverity::Trace => log::Level::Trace,
            LogSeverity::Debug => log::Level::Debug,
            LogSeverity::Info => log::Level::Info,
            LogSeverity::Warn | LogSeverity::Fixme => log::Level::Warn,
            LogSeverity::Error => log::Level::Error,
        };

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => log::log!(
                target: "retro3d",
                level,
                "[{}] {} ({}:{})",
                entry.source,
                entry.message,
                file,
                line
            ),
            _ if entry.severity == LogSeverity::Fixme => log::log!(
                target: "retro3d",
                level,
                "[{}] fixme: {}",
                entry.source,
                entry.message
            ),
            _ => log::log!(target: "retro3d", level, "[{}] {}", entry.source, entry.message),
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically disabled)
///
/// # Example
///
/// ```no_run
/// retro3d_bridge::engine_trace!("retro3d::CommandQueue", "Executed {}", "LoadBufferData");
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::retro3d::Engine::log(
            $crate::retro3d::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::retro3d::Engine::log(
            $crate::retro3d::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::retro3d::Engine::log(
            $crate::retro3d::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (rejected calls, potential issues)
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::retro3d::Engine::log(
            $crate::retro3d::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a FIXME message (tolerated but unimplemented behavior)
///
/// # Example
///
/// ```no_run
/// retro3d_bridge::engine_fixme!("retro3d::Buffer", "Unhandled lock flags: 0x{:x}", 0x4000);
/// ```
#[macro_export]
macro_rules! engine_fixme {
    ($source:expr, $($arg:tt)*) => {
        $crate::retro3d::Engine::log(
            $crate::retro3d::log::LogSeverity::Fixme,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::retro3d::Engine::log_detailed(
            $crate::retro3d::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and evaluate to `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use retro3d_bridge::engine_err;
/// let err = engine_err!("retro3d::vulkan", "vkCreateBuffer failed: {}", -2);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::retro3d::Engine::log_detailed(
            $crate::retro3d::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::retro3d::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log a WARN message and evaluate to `Error::InvalidCall` with the same text
///
/// Used for caller-side validation failures: the call is rejected, nothing
/// was mutated, and the caller may retry with corrected arguments.
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::retro3d::Engine::log(
            $crate::retro3d::log::LogSeverity::Warn,
            $source,
            message.clone()
        );
        $crate::retro3d::Error::InvalidCall(message)
    }};
}

/// Log a WARN message and return `Err(Error::InvalidCall)` from the enclosing function
#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
