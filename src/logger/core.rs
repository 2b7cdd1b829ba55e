//! Core logging implementation: filtering, formatting and output
//!
//! Handles colorized console output plus plain-text file persistence.
//! Console writes go through a broken-pipe-safe printer so piping the bot's
//! output into `head` does not panic the process.

use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::{stdout, ErrorKind, Write};
use std::sync::Mutex;

/// Tag column width for alignment
const TAG_WIDTH: usize = 10;

struct LoggerState {
    min_level: LogLevel,
    file: Option<File>,
}

static LOGGER: Lazy<Mutex<LoggerState>> = Lazy::new(|| {
    Mutex::new(LoggerState {
        min_level: LogLevel::Info,
        file: None,
    })
});

/// Initialize logger state: level from LOG_LEVEL env, optional log file
pub fn init(log_file: Option<&str>) {
    let min_level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|s| LogLevel::parse(&s))
        .unwrap_or(LogLevel::Info);

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("logger: cannot open log file {}: {}", path, e);
                None
            }
        }
    });

    let mut state = LOGGER.lock().unwrap();
    state.min_level = min_level;
    state.file = file;
}

/// Internal logging entry point with level filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    let mut state = LOGGER.lock().unwrap();

    // Errors always log; everything else obeys the threshold
    if level != LogLevel::Error && level > state.min_level {
        return;
    }

    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let console_line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        format_tag(tag),
        format_level(level),
        message
    );
    print_stdout_safe(&console_line);

    if let Some(ref mut file) = state.file {
        let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let file_line = format!(
            "{} [{}] [{}] {}\n",
            timestamp,
            tag.as_str(),
            level.as_str(),
            message
        );
        // File errors are not worth crashing or recursing over
        let _ = file.write_all(file_line.as_bytes());
    }
}

/// Format a tag with its subsystem color
fn format_tag(tag: LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.as_str(), width = TAG_WIDTH);
    match tag {
        LogTag::System => padded.bright_yellow().bold(),
        LogTag::Config => padded.bright_white().bold(),
        LogTag::Database => padded.bright_blue().bold(),
        LogTag::Ledger => padded.bright_green().bold(),
        LogTag::Telegram => padded.bright_cyan().bold(),
        LogTag::Admin => padded.bright_magenta().bold(),
    }
}

/// Format a level with its severity color
fn format_level(level: LogLevel) -> ColoredString {
    match level {
        LogLevel::Error => level.as_str().bright_red().bold(),
        LogLevel::Warning => level.as_str().bright_yellow(),
        LogLevel::Info => level.as_str().bright_green(),
        LogLevel::Debug => level.as_str().bright_black(),
    }
}

/// Print to stdout, ignoring broken pipes (e.g. `exchangebot | head`)
fn print_stdout_safe(line: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() != ErrorKind::BrokenPipe {
            eprintln!("logger: stdout write failed: {}", e);
        }
    }
}
