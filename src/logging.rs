/// Structured logging for the plant proximity monitor
///
/// Provides context-rich logging with component tags, an optional subject
/// (plant name or session id), timestamps, and severity levels. Supports
/// both console output and file-based logging for long-running servers.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Ingest,
    Geo,
    Zones,
    Map,
    Notify,
    Http,
    Store,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Ingest => write!(f, "INGEST"),
            Component::Geo => write!(f, "GEO"),
            Component::Zones => write!(f, "ZONE"),
            Component::Map => write!(f, "MAP"),
            Component::Notify => write!(f, "NOTIFY"),
            Component::Http => write!(f, "HTTP"),
            Component::Store => write!(f, "STORE"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - machine is offline, lookup service unreachable
    Expected,
    /// Unexpected failure - service answered with something we can't use
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, component: Component, subject: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, subject_part, message
        );

        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, subject_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, subject_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {}
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, component: Component, subject: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, component, subject, message);
        }
    }
}

pub fn info(component: Component, subject: Option<&str>, message: &str) {
    emit(LogLevel::Info, component, subject, message);
}

pub fn warn(component: Component, subject: Option<&str>, message: &str) {
    emit(LogLevel::Warning, component, subject, message);
}

pub fn error(component: Component, subject: Option<&str>, message: &str) {
    emit(LogLevel::Error, component, subject, message);
}

pub fn debug(component: Component, subject: Option<&str>, message: &str) {
    emit(LogLevel::Debug, component, subject, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a geolocation lookup failure from its rendered error message.
pub fn classify_geolocation_failure(error_message: &str) -> FailureType {
    // No network is the normal case on an air-gapped or offline machine
    if error_message.contains("Request failed") {
        FailureType::Expected
    }
    // The service answered, but with an error status or an unusable body
    else if error_message.contains("HTTP error") || error_message.contains("Parse error") {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Log one failed geolocation attempt with automatic classification
pub fn log_geolocation_failure(attempt: u32, max_attempts: u32, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_geolocation_failure(&error_msg);

    let message = format!(
        "lookup attempt {}/{} failed [{}]: {}",
        attempt, max_attempts, failure_type, error_msg
    );

    match failure_type {
        FailureType::Expected => debug(Component::Geo, None, &message),
        FailureType::Unexpected => error(Component::Geo, None, &message),
        FailureType::Unknown => warn(Component::Geo, None, &message),
    }
}

// ---------------------------------------------------------------------------
// Evaluation Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one evaluation; the level follows the worst active zone.
pub fn log_evaluation_summary(
    session: &str,
    total: usize,
    safe_zone: usize,
    moderate_zone: usize,
    dangerous_zone: usize,
) {
    let message = format!(
        "Evaluation complete: {} plants, zones safe={} moderate={} dangerous={}",
        total, safe_zone, moderate_zone, dangerous_zone
    );

    if dangerous_zone > 0 {
        error(Component::Zones, Some(session), &message);
    } else if moderate_zone > 0 {
        warn(Component::Zones, Some(session), &message);
    } else {
        info(Component::Zones, Some(session), &message);
    }
}
