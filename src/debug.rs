use parking_lot::Mutex;
/// Debug logging for par-annotate
///
/// Controlled by DEBUG_LEVEL environment variable:
/// - 0 or unset: No debugging
/// - 1: Errors only
/// - 2: Info level (registry changes, session summaries)
/// - 3: Debug level (per-session resolution, retirements, asset lookups)
/// - 4: Trace level (every provider decision and dropped span)
///
/// Categories used by the annotation core: `SESSION`, `CHAIN`, `ASSETS`.
///
/// All output goes to /tmp/par_annotate_debug.log on Unix/macOS,
/// or %TEMP%\par_annotate_debug.log on Windows, so annotated output on
/// stdout stays clean.
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};
use par_annotate_config::LogLevel;

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        match std::env::var("DEBUG_LEVEL") {
            Ok(val) => Self::parse(&val),
            Err(_) => DebugLevel::Off,
        }
    }

    fn parse(val: &str) -> Self {
        match val.trim().parse::<u8>() {
            Ok(1) => DebugLevel::Error,
            Ok(2) => DebugLevel::Info,
            Ok(3) => DebugLevel::Debug,
            Ok(4) => DebugLevel::Trace,
            _ => DebugLevel::Off,
        }
    }

    fn label(self) -> &'static str {
        match self {
            DebugLevel::Off => "OFF  ",
            DebugLevel::Error => "ERROR",
            DebugLevel::Info => "INFO ",
            DebugLevel::Debug => "DEBUG",
            DebugLevel::Trace => "TRACE",
        }
    }
}

/// Path of the shared debug log file.
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("par_annotate_debug.log")
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
    opened: bool,
}

impl DebugLogger {
    fn new() -> Self {
        let mut logger = DebugLogger {
            level: DebugLevel::from_env(),
            file: None,
            opened: false,
        };
        if logger.level != DebugLevel::Off {
            logger.ensure_file();
        }
        logger
    }

    /// Open the log file on first use. Failure is silent.
    fn ensure_file(&mut self) {
        if self.opened {
            return;
        }
        self.opened = true;
        if let Ok(f) = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
        {
            self.file = Some(f);
            let header = format!(
                "\n{}\npar-annotate debug session started at {} (level={:?})\n{}\n",
                "=".repeat(80),
                get_timestamp(),
                self.level,
                "=".repeat(80)
            );
            self.write_raw(&header);
        }
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level == DebugLevel::Off || level > self.level {
            return;
        }
        self.write_line(level.label(), category, msg);
    }

    fn write_line(&mut self, label: &str, category: &str, msg: &str) {
        self.ensure_file();
        let line = format!("[{}] [{}] [{}] {}\n", get_timestamp(), label, category, msg);
        self.write_raw(&line);
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new()))
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

/// `log` facade backend writing into the debug log file.
struct LogBridge {
    filter: LevelFilter,
    mirror_stderr: bool,
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let label = match record.level() {
            log::Level::Error => "ERROR",
            log::Level::Warn => "WARN ",
            log::Level::Info => "INFO ",
            log::Level::Debug => "DEBUG",
            log::Level::Trace => "TRACE",
        };
        let msg = record.args().to_string();
        get_logger()
            .lock()
            .write_line(label, record.target(), &msg);
        if self.mirror_stderr {
            eprintln!("[{}] {}: {}", label.trim_end(), record.target(), msg);
        }
    }

    fn flush(&self) {}
}

/// Level named by `RUST_LOG` when it holds a bare level (`RUST_LOG=debug`).
fn rust_log_level() -> Option<LogLevel> {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| LogLevel::parse(v.trim()))
}

/// Effective level: explicit (command line) over `RUST_LOG` over config.
pub fn resolve_log_level(explicit: Option<LogLevel>, configured: LogLevel) -> LogLevel {
    explicit.or_else(rust_log_level).unwrap_or(configured)
}

/// Route the `log` facade into the debug log file at `level`.
///
/// Records are mirrored to stderr when `RUST_LOG` is set. Calling this more
/// than once keeps the first logger and only updates the max level.
pub fn init_log_bridge(level: LogLevel) {
    let filter = level.to_level_filter();
    let bridge = LogBridge {
        filter,
        mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
    };
    if log::set_boxed_logger(Box::new(bridge)).is_err() {
        crate::debug_info!("LOG", "log bridge already installed");
    }
    log::set_max_level(filter);
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}
