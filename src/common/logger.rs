//! Structured logging with visual formatting.
//!
//! Output follows a box-drawing layout so a long-running acquisition daemon
//! produces a readable, grouped journal:
//!
//! ```text
//! ┏ earthpaper v0.4.0 ━━╸
//! ┃
//! ┣ Acquisition cycle for 14:20 UTC
//! ┃   Fetching 16 tiles...
//! ┣[WARNING] Attempt 1/10 failed: request timed out
//! ┃
//! ┣ Published 14:20 (2160x2160)
//! ╹
//! ```
//!
//! ## Logging Conventions
//!
//! - **`log_block_start!`** opens a new conceptual block (a cycle, a command).
//!   It prints an empty pipe for spacing followed by `┣ message`.
//! - **`log_decorated!`** continues an open block with `┣ message`.
//! - **`log_indented!`** lists details under the current line: `┃   message`.
//! - **`log_pipe!`** inserts one empty `┃` line, typically before a level macro
//!   that starts its own block.
//! - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**
//!   carry a coloured `[LEVEL]` tag.
//! - **`log_error_exit!`** closes the journal with `┗[ERROR] message`.
//! - **`log_version!`** / **`log_end!`** open and close the whole journal.
//!
//! Logging can be disabled at runtime (tests, `--json` output), prefixed with
//! UTC timestamps (daemon mode) and redirected to a file through a background
//! writer thread. `log_debug!` lines only appear once `--debug` turned them on.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static TIMESTAMPS_ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

// Channel for routing output to file when --log is active
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Visual style of a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// `┃\n┣ message`
    BlockStart,
    /// `┣ message`
    Decorated,
    /// `┃   message`
    Indented,
    /// `┃`
    Pipe,
    /// `┣[LEVEL] message`
    Level(Level),
    /// `┃\n┗[ERROR] message`
    ErrorExit,
    /// `╹`
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Debug => "\x1b[32mDEBUG\x1b[0m",
            Level::Info => "\x1b[32mINFO\x1b[0m",
            Level::Warning => "\x1b[33mWARNING\x1b[0m",
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Critical => "\x1b[31mCRITICAL\x1b[0m",
        }
    }
}

/// Main logging interface.
pub struct Log;

impl Log {
    /// Enable or disable logging.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Show `log_debug!` lines (`--debug`).
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    /// Prefix every line with the current UTC time (used by the daemon).
    pub fn set_timestamps(enabled: bool) {
        TIMESTAMPS_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Start file logging to the specified path.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Render and emit one line. Called by the logging macros.
    pub fn line(style: LineStyle, message: &str) {
        if !Self::is_enabled() || (style == LineStyle::Level(Level::Debug) && !Self::is_debug()) {
            return;
        }
        write_output(&Self::format_line(style, message));
    }

    fn format_line(style: LineStyle, message: &str) -> String {
        let prefix = if TIMESTAMPS_ENABLED.load(Ordering::SeqCst) {
            format!("[{}] ", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"))
        } else {
            String::new()
        };

        match style {
            LineStyle::BlockStart => format!("{prefix}┃\n{prefix}┣ {message}\n"),
            LineStyle::Decorated => format!("{prefix}┣ {message}\n"),
            LineStyle::Indented => format!("{prefix}┃   {message}\n"),
            LineStyle::Pipe => format!("{prefix}┃\n"),
            LineStyle::Level(level) => format!("{prefix}┣[{}] {message}\n", level.tag()),
            LineStyle::ErrorExit => {
                format!("{prefix}┃\n{prefix}┗[{}] {message}\n", Level::Error.tag())
            }
            LineStyle::End => format!("{prefix}╹\n"),
        }
    }
}

/// Guard for file logging that flushes and joins the writer thread on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Route formatted output to the log file when file logging is active,
/// otherwise to stdout.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros

#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($style:expr, $fmt:literal $($arg:tt)*) => {
        $crate::common::logger::Log::line($style, &format!($fmt $($arg)*))
    };
    ($style:expr, $expr:expr) => {
        $crate::common::logger::Log::line($style, &format!("{}", $expr))
    };
}

/// Start a new block of related log lines.
#[macro_export]
macro_rules! log_block_start {
    ($($t:tt)+) => { $crate::__log_line!($crate::common::logger::LineStyle::BlockStart, $($t)+) };
}

/// Continue the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($t:tt)+) => { $crate::__log_line!($crate::common::logger::LineStyle::Decorated, $($t)+) };
}

/// Nested detail line.
#[macro_export]
macro_rules! log_indented {
    ($($t:tt)+) => { $crate::__log_line!($crate::common::logger::LineStyle::Indented, $($t)+) };
}

/// Empty pipe line for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::common::logger::Log::line($crate::common::logger::LineStyle::Pipe, "")
    };
}

/// Application header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::common::logger::Log::line(
            $crate::common::logger::LineStyle::Decorated,
            &format!("earthpaper v{} ━━╸", env!("CARGO_PKG_VERSION")),
        )
    };
}

/// Final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::common::logger::Log::line($crate::common::logger::LineStyle::End, "")
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($t:tt)+) => {
        $crate::__log_line!(
            $crate::common::logger::LineStyle::Level($crate::common::logger::Level::Debug),
            $($t)+
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($($t:tt)+) => {
        $crate::__log_line!(
            $crate::common::logger::LineStyle::Level($crate::common::logger::Level::Info),
            $($t)+
        )
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($t:tt)+) => {
        $crate::__log_line!(
            $crate::common::logger::LineStyle::Level($crate::common::logger::Level::Warning),
            $($t)+
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($($t:tt)+) => {
        $crate::__log_line!(
            $crate::common::logger::LineStyle::Level($crate::common::logger::Level::Error),
            $($t)+
        )
    };
}

#[macro_export]
macro_rules! log_critical {
    ($($t:tt)+) => {
        $crate::__log_line!(
            $crate::common::logger::LineStyle::Level($crate::common::logger::Level::Critical),
            $($t)+
        )
    };
}

/// Error that terminates the current flow: `┗[ERROR] message`.
#[macro_export]
macro_rules! log_error_exit {
    ($($t:tt)+) => { $crate::__log_line!($crate::common::logger::LineStyle::ErrorExit, $($t)+) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        let colored = format!("┣[{}] disk published\n", Level::Warning.tag());
        assert_eq!(strip_ansi_codes(&colored), "┣[WARNING] disk published\n");
        assert_eq!(strip_ansi_codes("plain"), "plain");
    }

    #[test]
    fn test_line_styles() {
        assert_eq!(Log::format_line(LineStyle::Decorated, "x"), "┣ x\n");
        assert_eq!(Log::format_line(LineStyle::Indented, "x"), "┃   x\n");
        assert_eq!(Log::format_line(LineStyle::BlockStart, "x"), "┃\n┣ x\n");
        assert_eq!(Log::format_line(LineStyle::End, ""), "╹\n");
        assert!(
            Log::format_line(LineStyle::ErrorExit, "boom")
                .ends_with("┗[\x1b[31mERROR\x1b[0m] boom\n")
        );
    }
}
