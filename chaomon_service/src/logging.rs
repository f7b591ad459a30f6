/// Structured logging for the basin monitoring service
///
/// Sets up the `tracing` subscriber once at process entry and provides
/// context-rich failure logging with source/station identifiers, so a cron
/// mail or journal shows at a glance which poll failed and whether the
/// failure is routine.

use std::fmt;

use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*};

use crate::model::SourceError;

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

impl LogLevel {
    /// Parses `debug`/`info`/`warn`/`warning`/`error`, case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
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
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// thaiwater.net station table (In Buri bridge).
    ThaiWater,
    /// HII dam telemetry page.
    Hii,
    /// OpenWeatherMap forecast API.
    OpenWeather,
    /// LINE messaging push API.
    Line,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::ThaiWater => write!(f, "THAIWATER"),
            DataSource::Hii => write!(f, "HII"),
            DataSource::OpenWeather => write!(f, "OWM"),
            DataSource::Line => write!(f, "LINE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - source publishes nothing for this slot, or the
    /// operator left an optional credential unset
    Expected,
    /// Unexpected failure - the source is down or changed its layout
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
// Subscriber setup
// ---------------------------------------------------------------------------

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over `min_level` when set. Safe to call more than once;
/// later calls are ignored (integration tests share one process).
pub fn init_logger(min_level: LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("logger already initialised");
    }
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a source failure by its error kind.
pub fn classify_source_failure(err: &SourceError) -> FailureType {
    match err {
        // The forecast key is optional in deployments that only watch water.
        SourceError::MissingApiKey(_) => FailureType::Expected,
        // Outages and timeouts on government sites happen, but are worth a look
        SourceError::Http(_) | SourceError::Request(_) => FailureType::Unexpected,
        // Layout changes break the scrape outright
        SourceError::Parse(_) | SourceError::StationNotFound(_) => FailureType::Unexpected,
        // Gauges go quiet between reports
        SourceError::NoDataAvailable(_) => FailureType::Unknown,
    }
}

/// Log a data source failure with automatic classification
pub fn log_source_failure(source: DataSource, station: &str, operation: &str, err: &SourceError) {
    let failure_type = classify_source_failure(err);
    let source = source.to_string();

    match failure_type {
        FailureType::Expected => tracing::debug!(
            source = %source, station, failure = %failure_type, "{} failed: {}", operation, err
        ),
        FailureType::Unexpected => tracing::error!(
            source = %source, station, failure = %failure_type, "{} failed: {}", operation, err
        ),
        FailureType::Unknown => tracing::warn!(
            source = %source, station, failure = %failure_type, "{} failed: {}", operation, err
        ),
    }
}
