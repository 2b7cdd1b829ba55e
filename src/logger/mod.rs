//! Structured logging for the exchange bot
//!
//! Provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug)
//! - Per-subsystem tags for filtering and colored console output
//! - Dual output: colored console + append-only log file
//!
//! ## Usage
//!
//! ```rust,ignore
//! use exchangebot::logger::{self, LogTag};
//!
//! logger::info(LogTag::Telegram, "Bot started");
//! logger::error(LogTag::Database, "Failed to open database");
//! ```
//!
//! Call `logger::init(log_file)` once at startup before any logging occurs.

mod core;
mod levels;
mod tags;

pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Must be called once at application startup. Opens the log file for
/// appending and reads the minimum level from the `LOG_LEVEL` environment
/// variable (defaults to Info).
pub fn init(log_file: Option<&str>) {
    core::init(log_file);
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues that need attention)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operational messages)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics, gated by LOG_LEVEL=debug)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}
