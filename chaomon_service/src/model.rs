/// Reading, WeatherSnapshot, EventKind, SourceError
/// core data structures and error handling
///
/// Core data types for the Chao Phraya basin monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O. Everything that touches the network or the disk works
/// in terms of these types.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Literal written into a log field whose value is unavailable.
pub const NOT_AVAILABLE: &str = "N/A";

/// Asia/Bangkok is UTC+7 all year (no daylight saving).
pub const BANGKOK_OFFSET_SECS: i32 = 7 * 3600;

/// The local offset every log timestamp is written in.
pub fn bangkok() -> FixedOffset {
    FixedOffset::east_opt(BANGKOK_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current wall-clock time in Bangkok local time.
pub fn now_bangkok() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&bangkok())
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One normalized observation from a station or metric source.
///
/// `primary_value == None` means the source answered but the value was
/// unusable (empty, non-numeric, NaN). Downstream evaluation treats it as
/// unavailable, never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub station_id: String,
    pub primary_value: Option<f64>,
    /// Source-formatted text of the primary value, used for categorical
    /// comparison (e.g. dam storage `"1,234.5"` → `"1234.5"`).
    pub primary_text: Option<String>,
    pub secondary_value: Option<f64>,
    pub status: Option<String>,
    pub observed_at: Option<String>, // source-formatted, e.g. "19/10/2026 14:00"
    pub fetched_at: DateTime<FixedOffset>,
}

impl Reading {
    pub fn new(station_id: impl Into<String>, fetched_at: DateTime<FixedOffset>) -> Self {
        Self {
            station_id: station_id.into(),
            primary_value: None,
            primary_text: None,
            secondary_value: None,
            status: None,
            observed_at: None,
            fetched_at,
        }
    }

    /// The primary value, if present and numerically valid.
    pub fn valid_primary(&self) -> Option<f64> {
        self.primary_value.filter(|v| v.is_finite())
    }

    /// Distance from the water surface down to the bank top, rounded to cm.
    /// Positive means the water is still below the bank.
    pub fn below_bank(&self) -> Option<f64> {
        match (self.valid_primary(), self.secondary_value.filter(|v| v.is_finite())) {
            (Some(water), Some(bank)) => Some(round2(bank - water)),
            _ => None,
        }
    }
}

/// Rounds to two decimal places (centimetres when the unit is metres).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Weather types
// ---------------------------------------------------------------------------

/// Weather condition as reported by the forecast provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCategory {
    /// Provider condition code: 2xx thunderstorm, 3xx drizzle, 5xx rain,
    /// 6xx snow, 7xx atmosphere, 800 clear, 80x clouds.
    pub id: Option<u16>,
    pub main: String,
    pub description: String,
}

impl WeatherCategory {
    /// True for thunderstorm, drizzle and rain conditions.
    pub fn is_rain_or_thunderstorm(&self) -> bool {
        match self.id {
            Some(id) => (200..600).contains(&id),
            None => {
                let main = self.main.to_lowercase();
                main.contains("rain") || main.contains("drizzle") || main.contains("thunderstorm")
            }
        }
    }

    pub fn is_thunderstorm(&self) -> bool {
        match self.id {
            Some(id) => (200..300).contains(&id),
            None => self.main.to_lowercase().contains("thunderstorm"),
        }
    }
}

/// One 3-hour slot of the forecast list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<FixedOffset>,
    pub category: WeatherCategory,
    /// Probability of precipitation, 0.0..=1.0.
    pub precipitation_probability: f64,
    /// Rain volume for the 3-hour slot, in millimetres.
    pub rain_volume_3h: f64,
    pub cloud_pct: f64,
    pub temp_max: f64,
}

/// "Right now" conditions, queried separately from the forecast list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub observed_at: DateTime<FixedOffset>,
    pub category: WeatherCategory,
    pub rain_1h: Option<f64>,
    pub temp: Option<f64>,
}

/// Everything one weather poll produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// `None` when the current-conditions query failed; the forecast scan
    /// still runs.
    pub current: Option<CurrentWeather>,
    pub entries: Vec<ForecastEntry>,
    pub fetched_at: DateTime<FixedOffset>,
}

// ---------------------------------------------------------------------------
// Alert decision types
// ---------------------------------------------------------------------------

/// Closed set of weather event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    RainNow,
    ForecastRain,
    HeatWave,
    NoSignificantEvent,
}

impl EventKind {
    /// Forecast kinds carry an occurrence time that can supersede an
    /// earlier alert; `RainNow` only ever means "now".
    pub fn is_forecast(self) -> bool {
        matches!(self, EventKind::ForecastRain | EventKind::HeatWave)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::RainNow => write!(f, "RAIN_NOW"),
            EventKind::ForecastRain => write!(f, "FORECAST_RAIN"),
            EventKind::HeatWave => write!(f, "HEAT_WAVE"),
            EventKind::NoSignificantEvent => write!(f, "NO_SIGNIFICANT_EVENT"),
        }
    }
}

/// A classified weather event worth considering for notification.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherEvent {
    pub kind: EventKind,
    pub occurrence_time: DateTime<FixedOffset>,
    /// Rain volume (mm) for rain kinds, temperature (°C) for heat.
    pub value: f64,
    /// The slot or observation that produced the event, kept for formatting.
    pub category: WeatherCategory,
}

/// Sign of a water-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rising,
    Falling,
}

impl Direction {
    pub fn sign(self) -> char {
        match self {
            Direction::Rising => '+',
            Direction::Falling => '-',
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding an external source.
///
/// `Http` and `Request` are "source unavailable"; the remaining variants are
/// "parse mismatch". Both degrade a run the same way.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// Non-2xx HTTP response.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Network failure, timeout, or unreadable local page.
    #[error("request failed: {0}")]
    Request(String),
    /// The body did not have the expected structure.
    #[error("parse error: {0}")]
    Parse(String),
    /// The page was readable but did not contain the station.
    #[error("station not found: {0}")]
    StationNotFound(String),
    /// The station was found but carried no usable value.
    #[error("no data available for {0}")]
    NoDataAvailable(String),
    /// The forecast provider needs an API key and none is configured.
    #[error("missing API key for {0}")]
    MissingApiKey(String),
}

impl SourceError {
    pub fn is_parse_mismatch(&self) -> bool {
        matches!(
            self,
            SourceError::Parse(_) | SourceError::StationNotFound(_) | SourceError::NoDataAvailable(_)
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Http(status.as_u16()),
            None => SourceError::Request(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
