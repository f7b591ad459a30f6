/// OpenWeatherMap client
///
/// Retrieves the 5 day / 3 hour forecast list and the current conditions
/// for one coordinate pair, in metric units.
///
/// API Documentation: https://openweathermap.org/forecast5
/// Current conditions: https://openweathermap.org/current

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use super::{API_TIMEOUT, SourceAdapter, build_client};
use crate::config::Config;
use crate::logging::{DataSource, log_source_failure};
use crate::model::{
    CurrentWeather, ForecastEntry, SourceError, WeatherCategory, WeatherSnapshot, bangkok, now_bangkok,
};
use crate::stations::STATION_SINGBURI_WEATHER;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

// ============================================================================
// API Response Structures
// ============================================================================

/// `/forecast` response.
#[derive(Debug, Deserialize)]
pub struct OwmForecastResponse {
    pub list: Vec<OwmForecastItem>,
}

/// One 3-hour slot.
#[derive(Debug, Deserialize)]
pub struct OwmForecastItem {
    pub dt: i64, // epoch seconds, UTC
    pub main: OwmMain,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    #[serde(default)]
    pub clouds: Option<OwmClouds>,
    #[serde(default)]
    pub pop: Option<f64>,
    #[serde(default)]
    pub rain: Option<OwmRain>,
}

/// `/weather` response.
#[derive(Debug, Deserialize)]
pub struct OwmCurrentResponse {
    pub dt: i64,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    pub main: OwmMain,
    #[serde(default)]
    pub rain: Option<OwmRain>,
}

#[derive(Debug, Deserialize)]
pub struct OwmMain {
    pub temp: Option<f64>,
    pub temp_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OwmCondition {
    pub id: Option<u16>,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct OwmClouds {
    pub all: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OwmRain {
    #[serde(rename = "1h")]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h")]
    pub three_hours: Option<f64>,
}

// ============================================================================
// URLs
// ============================================================================

pub fn build_forecast_url(base: &str, lat: f64, lon: f64, api_key: &str) -> String {
    format!(
        "{}/forecast?lat={}&lon={}&appid={}&units=metric",
        base.trim_end_matches('/'),
        lat,
        lon,
        api_key
    )
}

pub fn build_current_url(base: &str, lat: f64, lon: f64, api_key: &str) -> String {
    format!(
        "{}/weather?lat={}&lon={}&appid={}&units=metric",
        base.trim_end_matches('/'),
        lat,
        lon,
        api_key
    )
}

// ============================================================================
// Parsing
// ============================================================================

/// Decodes a `/forecast` body into entries in chronological order.
///
/// A slot without any temperature is dropped with a warning; the rest of
/// the forecast is still usable.
pub fn parse_forecast(body: &str) -> Result<Vec<ForecastEntry>, SourceError> {
    let response: OwmForecastResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("forecast: {}", e)))?;

    let mut entries = Vec::with_capacity(response.list.len());
    for item in response.list {
        let time = epoch_to_local(item.dt)?;
        let Some(temp_max) = item.main.temp_max.or(item.main.temp) else {
            tracing::warn!(slot = %time, "forecast slot has no temperature, skipping");
            continue;
        };
        entries.push(ForecastEntry {
            time,
            category: first_condition(item.weather),
            precipitation_probability: item.pop.unwrap_or(0.0),
            rain_volume_3h: item.rain.and_then(|r| r.three_hours).unwrap_or(0.0),
            cloud_pct: item.clouds.and_then(|c| c.all).unwrap_or(0.0),
            temp_max,
        });
    }

    // The API already sorts by time; the classifier depends on it, so make sure.
    entries.sort_by_key(|e| e.time);
    Ok(entries)
}

/// Decodes a `/weather` body.
pub fn parse_current(body: &str) -> Result<CurrentWeather, SourceError> {
    let response: OwmCurrentResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("current: {}", e)))?;

    Ok(CurrentWeather {
        observed_at: epoch_to_local(response.dt)?,
        category: first_condition(response.weather),
        rain_1h: response.rain.and_then(|r| r.one_hour),
        temp: response.main.temp,
    })
}

fn first_condition(conditions: Vec<OwmCondition>) -> WeatherCategory {
    match conditions.into_iter().next() {
        Some(c) => WeatherCategory {
            id: c.id,
            main: c.main,
            description: c.description,
        },
        None => WeatherCategory {
            id: None,
            main: String::new(),
            description: String::new(),
        },
    }
}

fn epoch_to_local(secs: i64) -> Result<DateTime<FixedOffset>, SourceError> {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.with_timezone(&bangkok()))
        .ok_or_else(|| SourceError::Parse(format!("timestamp out of range: {}", secs)))
}

// ============================================================================
// Adapter
// ============================================================================

pub struct OpenWeatherAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl OpenWeatherAdapter {
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(API_TIMEOUT)?,
            base_url: config.openweather_url.clone(),
            api_key: config.openweather_api_key.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
        })
    }

    fn api_key(&self) -> Result<&str, SourceError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SourceError::MissingApiKey("OPENWEATHER_API_KEY".into()))
    }

    fn get(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).header("Accept", "application/json").send()?;
        if !response.status().is_success() {
            return Err(SourceError::Http(response.status().as_u16()));
        }
        Ok(response.text()?)
    }

    pub fn fetch_forecast(&self) -> Result<Vec<ForecastEntry>, SourceError> {
        let url = build_forecast_url(&self.base_url, self.latitude, self.longitude, self.api_key()?);
        parse_forecast(&self.get(&url)?)
    }

    pub fn fetch_current(&self) -> Result<CurrentWeather, SourceError> {
        let url = build_current_url(&self.base_url, self.latitude, self.longitude, self.api_key()?);
        parse_current(&self.get(&url)?)
    }
}

impl SourceAdapter for OpenWeatherAdapter {
    type Output = WeatherSnapshot;

    fn source(&self) -> DataSource {
        DataSource::OpenWeather
    }

    fn station_id(&self) -> &str {
        STATION_SINGBURI_WEATHER
    }

    /// The forecast is required; current conditions are best effort.
    fn fetch(&self) -> Result<WeatherSnapshot, SourceError> {
        let entries = self.fetch_forecast()?;
        let current = match self.fetch_current() {
            Ok(current) => Some(current),
            Err(e) => {
                log_source_failure(DataSource::OpenWeather, STATION_SINGBURI_WEATHER, "current weather", &e);
                None
            }
        };
        Ok(WeatherSnapshot {
            current,
            entries,
            fetched_at: now_bangkok(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: &str = r#"{
        "cod": "200",
        "cnt": 3,
        "list": [
            {"dt": 1760875200, "main": {"temp": 33.1, "temp_max": 34.2},
             "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
             "clouds": {"all": 75}, "pop": 0.62, "rain": {"3h": 2.4},
             "dt_txt": "2025-10-19 12:00:00"},
            {"dt": 1760864400, "main": {"temp": 31.0, "temp_max": 31.5},
             "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds"}],
             "clouds": {"all": 60}, "pop": 0,
             "dt_txt": "2025-10-19 09:00:00"},
            {"dt": 1760886000, "main": {"temp": 36.0, "temp_max": 36.4},
             "weather": [], "dt_txt": "2025-10-19 15:00:00"}
        ]
    }"#;

    #[test]
    fn test_forecast_url_format() {
        let url = build_forecast_url("https://api.openweathermap.org/data/2.5/", 14.8966, 100.3892, "k3y");
        assert_eq!(
            url,
            "https://api.openweathermap.org/data/2.5/forecast?lat=14.8966&lon=100.3892&appid=k3y&units=metric"
        );
        let url = build_current_url(OPENWEATHER_BASE_URL, 14.8966, 100.3892, "k3y");
        assert!(url.starts_with("https://api.openweathermap.org/data/2.5/weather?"), "{}", url);
    }

    #[test]
    fn test_parse_forecast_sorts_and_defaults_missing_fields() {
        let entries = parse_forecast(FORECAST).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].time <= w[1].time));

        let first = &entries[0];
        assert_eq!(first.category.main, "Clouds");
        assert_eq!(first.rain_volume_3h, 0.0);
        assert_eq!(first.precipitation_probability, 0.0);

        let rain = &entries[1];
        assert_eq!(rain.category.id, Some(500));
        assert_eq!(rain.rain_volume_3h, 2.4);
        assert_eq!(rain.precipitation_probability, 0.62);
        assert_eq!(rain.cloud_pct, 75.0);
        assert_eq!(rain.temp_max, 34.2);
        assert_eq!(rain.time.to_rfc3339(), "2025-10-19T19:00:00+07:00");

        let empty_weather = &entries[2];
        assert_eq!(empty_weather.category.id, None);
        assert!(!empty_weather.category.is_rain_or_thunderstorm());
    }

    #[test]
    fn test_slot_without_temperature_is_skipped() {
        let body = r#"{"list": [
            {"dt": 1760864400, "main": {},
             "weather": [{"id": 500, "main": "Rain", "description": "light rain"}], "pop": 0.9},
            {"dt": 1760875200, "main": {"temp": 32.0},
             "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}]}
        ]}"#;
        let entries = parse_forecast(body).unwrap();
        assert_eq!(entries.len(), 1, "the slot without temperature should be dropped");
        assert_eq!(entries[0].category.main, "Clear");
        assert_eq!(entries[0].temp_max, 32.0, "falls back to temp when temp_max is absent");
    }

    #[test]
    fn test_parse_forecast_rejects_missing_list() {
        let result = parse_forecast(r#"{"cod": "401", "message": "Invalid API key"}"#);
        assert!(matches!(result, Err(SourceError::Parse(_))), "got {:?}", result);
    }

    #[test]
    fn test_parse_current_reads_one_hour_rain() {
        let body = r#"{"dt": 1760875200, "main": {"temp": 29.5},
                       "weather": [{"id": 211, "main": "Thunderstorm", "description": "thunderstorm"}],
                       "rain": {"1h": 3.2}}"#;
        let current = parse_current(body).unwrap();
        assert!(current.category.is_thunderstorm());
        assert_eq!(current.rain_1h, Some(3.2));
        assert_eq!(current.temp, Some(29.5));
    }

    #[test]
    fn test_missing_api_key_is_reported_before_any_request() {
        let config = Config {
            openweather_api_key: None,
            ..Config::default()
        };
        let adapter = OpenWeatherAdapter::from_config(&config).unwrap();
        assert_eq!(
            adapter.fetch().unwrap_err(),
            SourceError::MissingApiKey("OPENWEATHER_API_KEY".into())
        );
    }

    #[test]
    #[ignore] // Requires network access and OPENWEATHER_API_KEY
    fn test_fetch_live_forecast() {
        let Some(key) = std::env::var("OPENWEATHER_API_KEY").ok() else {
            return;
        };
        let config = Config {
            openweather_api_key: Some(key),
            ..Config::default()
        };
        let snapshot = OpenWeatherAdapter::from_config(&config).unwrap().fetch().unwrap();
        assert!(!snapshot.entries.is_empty());
    }
}
