/// Runtime configuration, built once at process entry.
///
/// Defaults ← optional TOML file ← process environment. Every numeric value
/// is validated; a bad value never fails the run, it falls back to the
/// default and is reported as a [`ConfigWarning`] for the caller to log.
///
/// Credentials (LINE token, forecast API key) are read from the environment
/// only, never from the TOML file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::logging::LogLevel;
use crate::stations::{self, StationId};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_THRESHOLD_M: f64 = 0.10;
pub const DEFAULT_RAIN_POP: f64 = 0.30;
pub const DEFAULT_RAIN_MIN_MM: f64 = 5.0;
pub const DEFAULT_HEAT_C: f64 = 35.0;
pub const DEFAULT_LOOKAHEAD_HOURS: f64 = 24.0;
pub const DEFAULT_COOLDOWN_HOURS: f64 = 6.0;
pub const DEFAULT_STALE_AFTER_HOURS: f64 = 6.0;
/// Upper bound for every hour-valued setting (one year).
pub const MAX_HOURS: f64 = 24.0 * 365.0;
pub const DEFAULT_CONFIG_FILE: &str = "chaomon.toml";
pub const DEFAULT_LOCAL_HTML: &str = "page.html";

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Thresholds driving the weather classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherThresholds {
    /// Minimum probability of precipitation, 0.0..=1.0.
    pub rain_pop: f64,
    /// Minimum 3-hour rain volume, mm.
    pub rain_min_mm: f64,
    /// Minimum forecast maximum temperature, °C.
    pub heat_c: f64,
    pub lookahead_hours: f64,
}

impl Default for WeatherThresholds {
    fn default() -> Self {
        Self {
            rain_pop: DEFAULT_RAIN_POP,
            rain_min_mm: DEFAULT_RAIN_MIN_MM,
            heat_c: DEFAULT_HEAT_C,
            lookahead_hours: DEFAULT_LOOKAHEAD_HOURS,
        }
    }
}

impl WeatherThresholds {
    pub fn lookahead(&self) -> Duration {
        hours_or(self.lookahead_hours, DEFAULT_LOOKAHEAD_HOURS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Minimum absolute water-level change that triggers an alert, metres.
    pub threshold_m: f64,
    pub weather: WeatherThresholds,
    pub cooldown_hours: f64,
    pub stale_after_hours: f64,
    pub latitude: f64,
    pub longitude: f64,

    pub dry_run: bool,
    pub use_local_html: bool,
    pub local_html_path: PathBuf,

    pub bridge_url: String,
    pub dam_url: String,
    pub openweather_url: String,
    pub summary_image_url: Option<String>,

    pub line_token: Option<String>,
    pub line_target: Option<String>,
    pub openweather_api_key: Option<String>,

    pub data_dir: PathBuf,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        let weather = stations::station(StationId::SingburiWeather);
        Self {
            threshold_m: DEFAULT_THRESHOLD_M,
            weather: WeatherThresholds::default(),
            cooldown_hours: DEFAULT_COOLDOWN_HOURS,
            stale_after_hours: DEFAULT_STALE_AFTER_HOURS,
            latitude: weather.latitude,
            longitude: weather.longitude,
            dry_run: false,
            use_local_html: false,
            local_html_path: PathBuf::from(DEFAULT_LOCAL_HTML),
            bridge_url: stations::station(StationId::Inburi).default_url.to_string(),
            dam_url: stations::station(StationId::ChaophrayaDam).default_url.to_string(),
            openweather_url: weather.default_url.to_string(),
            summary_image_url: None,
            line_token: None,
            line_target: None,
            openweather_api_key: None,
            data_dir: PathBuf::from("."),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    pub fn cooldown(&self) -> Duration {
        hours_or(self.cooldown_hours, DEFAULT_COOLDOWN_HOURS)
    }

    pub fn stale_after(&self) -> Duration {
        hours_or(self.stale_after_hours, DEFAULT_STALE_AFTER_HOURS)
    }

    /// Path of a file inside the data directory.
    pub fn data_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// Loads the TOML file (if any) and the process environment.
    ///
    /// `explicit_path` comes from the command line; otherwise
    /// `CHAOMON_CONFIG`, then `chaomon.toml` in the working directory.
    pub fn load(explicit_path: Option<&Path>) -> (Config, Vec<ConfigWarning>) {
        let env = |key: &str| std::env::var(key).ok();
        let mut warnings = Vec::new();

        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| env("CHAOMON_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let file = if path.exists() {
            match FileConfig::from_path(&path) {
                Ok(file) => file,
                Err(e) => {
                    warnings.push(ConfigWarning {
                        key: path.display().to_string(),
                        raw: e,
                        fallback: "built-in defaults".to_string(),
                    });
                    FileConfig::default()
                }
            }
        } else {
            FileConfig::default()
        };

        let (config, more) = Config::from_lookup(&file, env);
        warnings.extend(more);
        (config, warnings)
    }

    /// Resolves configuration from a parsed file and a key lookup.
    ///
    /// The lookup stands in for the process environment so callers (and
    /// tests) can supply any source of key/value pairs.
    pub fn from_lookup<F>(file: &FileConfig, lookup: F) -> (Config, Vec<ConfigWarning>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut r = Resolver {
            lookup: &non_blank,
            warnings: Vec::new(),
        };

        let t = &file.thresholds;
        let threshold_m = r.number("NOTIFICATION_THRESHOLD_M", t.notification_threshold_m, DEFAULT_THRESHOLD_M, positive);
        let weather = WeatherThresholds {
            rain_pop: r.number("RAIN_POP_THRESHOLD", t.rain_pop, DEFAULT_RAIN_POP, probability),
            rain_min_mm: r.number("RAIN_MIN_MM", t.rain_min_mm, DEFAULT_RAIN_MIN_MM, non_negative),
            heat_c: r.number("HEAT_THRESHOLD_C", t.heat_c, DEFAULT_HEAT_C, finite),
            lookahead_hours: r.number("FORECAST_LOOKAHEAD_HOURS", t.lookahead_hours, DEFAULT_LOOKAHEAD_HOURS, hour_span),
        };
        let cooldown_hours = r.number("ALERT_COOLDOWN_HOURS", t.cooldown_hours, DEFAULT_COOLDOWN_HOURS, hour_span_or_zero);
        let stale_after_hours = r.number("STALE_AFTER_HOURS", t.stale_after_hours, DEFAULT_STALE_AFTER_HOURS, hour_span);

        let l = &file.location;
        let latitude = r.number("WEATHER_LAT", l.latitude, defaults.latitude, latitude);
        let longitude = r.number("WEATHER_LON", l.longitude, defaults.longitude, longitude);

        let s = &file.sources;
        let o = &file.output;
        let dry_run = r.flag("DRY_RUN", o.dry_run);
        let use_local_html = r.flag("USE_LOCAL_HTML", s.use_local_html);
        let local_html_path = r
            .text("LOCAL_HTML_PATH", s.local_html_path.clone())
            .map(PathBuf::from)
            .unwrap_or(defaults.local_html_path);

        let log_level = match r.text("LOG_LEVEL", o.log_level.clone()) {
            Some(raw) => LogLevel::parse(&raw).unwrap_or_else(|| {
                r.warn("LOG_LEVEL", &raw, defaults.log_level.to_string());
                defaults.log_level
            }),
            None => defaults.log_level,
        };

        let config = Config {
            threshold_m,
            weather,
            cooldown_hours,
            stale_after_hours,
            latitude,
            longitude,
            dry_run,
            use_local_html,
            local_html_path,
            bridge_url: r.text("BRIDGE_URL", s.bridge_url.clone()).unwrap_or(defaults.bridge_url),
            dam_url: r.text("DAM_URL", s.dam_url.clone()).unwrap_or(defaults.dam_url),
            openweather_url: r
                .text("OPENWEATHER_URL", s.openweather_url.clone())
                .unwrap_or(defaults.openweather_url),
            summary_image_url: r.text("SUMMARY_IMAGE_URL", o.summary_image_url.clone()),
            line_token: r.text("LINE_CHANNEL_ACCESS_TOKEN", None),
            line_target: r.text("LINE_TARGET_ID", None),
            openweather_api_key: r.text("OPENWEATHER_API_KEY", None),
            data_dir: r
                .text("DATA_DIR", o.data_dir.clone())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            log_level,
        };

        (config, r.warnings)
    }
}

/// Converts fractional hours to a chrono duration, at second resolution.
/// Returns `None` for values chrono cannot represent.
pub fn hours(h: f64) -> Option<Duration> {
    let secs = (h * 3600.0).round();
    if !secs.is_finite() {
        return None;
    }
    // `as` saturates; try_seconds rejects the saturated extremes.
    Duration::try_seconds(secs as i64)
}

/// [`hours`], substituting `fallback` hours for an unrepresentable value.
pub fn hours_or(h: f64, fallback: f64) -> Duration {
    hours(h).or_else(|| hours(fallback)).unwrap_or_else(Duration::zero)
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// A configuration value that was rejected and replaced by a fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub key: String,
    pub raw: String,
    pub fallback: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}='{}' is invalid, using {}", self.key, self.raw, self.fallback)
    }
}

// ---------------------------------------------------------------------------
// TOML file structures
// ---------------------------------------------------------------------------

/// Root TOML structure. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub thresholds: ThresholdSection,
    pub location: LocationSection,
    pub sources: SourceSection,
    pub output: OutputSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdSection {
    pub notification_threshold_m: Option<f64>,
    pub rain_pop: Option<f64>,
    pub rain_min_mm: Option<f64>,
    pub heat_c: Option<f64>,
    pub lookahead_hours: Option<f64>,
    pub cooldown_hours: Option<f64>,
    pub stale_after_hours: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocationSection {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub bridge_url: Option<String>,
    pub dam_url: Option<String>,
    pub openweather_url: Option<String>,
    pub use_local_html: Option<bool>,
    pub local_html_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub data_dir: Option<String>,
    pub dry_run: Option<bool>,
    pub summary_image_url: Option<String>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_path(path: &Path) -> Result<FileConfig, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        FileConfig::parse(&content)
    }

    pub fn parse(content: &str) -> Result<FileConfig, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

struct Resolver<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
    warnings: Vec<ConfigWarning>,
}

impl Resolver<'_> {
    fn warn(&mut self, key: &str, raw: &str, fallback: String) {
        self.warnings.push(ConfigWarning {
            key: key.to_string(),
            raw: raw.to_string(),
            fallback,
        });
    }

    /// Environment first, then file, then default. An invalid value at
    /// either layer falls back to the default rather than to the layer below.
    fn number(&mut self, key: &str, file: Option<f64>, default: f64, valid: fn(f64) -> bool) -> f64 {
        if let Some(raw) = (self.lookup)(key) {
            return match raw.trim().parse::<f64>() {
                Ok(v) if valid(v) => v,
                _ => {
                    self.warn(key, &raw, format!("{default}"));
                    default
                }
            };
        }
        match file {
            Some(v) if valid(v) => v,
            Some(v) => {
                self.warn(key, &v.to_string(), format!("{default}"));
                default
            }
            None => default,
        }
    }

    fn flag(&mut self, key: &str, file: Option<bool>) -> bool {
        match (self.lookup)(key) {
            Some(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            None => file.unwrap_or(false),
        }
    }

    fn text(&mut self, key: &str, file: Option<String>) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .or(file.filter(|v| !v.trim().is_empty()))
    }
}

fn finite(v: f64) -> bool {
    v.is_finite()
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn hour_span(v: f64) -> bool {
    positive(v) && v <= MAX_HOURS
}

fn hour_span_or_zero(v: f64) -> bool {
    non_negative(v) && v <= MAX_HOURS
}

fn probability(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn latitude(v: f64) -> bool {
    v.is_finite() && (-90.0..=90.0).contains(&v)
}

fn longitude(v: f64) -> bool {
    v.is_finite() && (-180.0..=180.0).contains(&v)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
