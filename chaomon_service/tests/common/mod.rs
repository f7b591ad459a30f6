//! Fakes shared by the run-level integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, Duration, FixedOffset, TimeZone};

use chaomon_service::config::Config;
use chaomon_service::ingest::SourceAdapter;
use chaomon_service::logging::DataSource;
use chaomon_service::model::{Reading, SourceError, WeatherSnapshot, bangkok};
use chaomon_service::notify::{Notification, Notifier, NotifyError};

/// A fixed "now" used across all tests: 2026-10-19 09:00 Bangkok.
pub fn fixed_now() -> DateTime<FixedOffset> {
    bangkok().with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
}

pub fn hours_later(h: i64) -> DateTime<FixedOffset> {
    fixed_now() + Duration::hours(h)
}

pub fn config_in(dir: &Path) -> Config {
    Config {
        data_dir: dir.to_path_buf(),
        ..Config::default()
    }
}

/// Adapter that returns a canned result.
pub struct FakeSource<T> {
    pub source: DataSource,
    pub station_id: &'static str,
    pub result: Result<T, SourceError>,
}

impl<T: Clone> SourceAdapter for FakeSource<T> {
    type Output = T;

    fn source(&self) -> DataSource {
        self.source
    }

    fn station_id(&self) -> &str {
        self.station_id
    }

    fn fetch(&self) -> Result<T, SourceError> {
        self.result.clone()
    }
}

pub fn bridge_source(result: Result<Reading, SourceError>) -> FakeSource<Reading> {
    FakeSource { source: DataSource::ThaiWater, station_id: "inburi", result }
}

pub fn dam_source(result: Result<Reading, SourceError>) -> FakeSource<Reading> {
    FakeSource { source: DataSource::Hii, station_id: "chaophraya_dam", result }
}

pub fn weather_source(result: Result<WeatherSnapshot, SourceError>) -> FakeSource<WeatherSnapshot> {
    FakeSource { source: DataSource::OpenWeather, station_id: "singburi_weather", result }
}

/// Bridge reading with the given water level and a 13 m bank.
pub fn bridge_reading(level: Option<f64>) -> Reading {
    let mut reading = Reading::new("inburi", fixed_now());
    reading.primary_value = level;
    reading.primary_text = Some(level.map_or_else(|| "-".to_string(), |l| format!("{:.2}", l)));
    reading.secondary_value = Some(13.0);
    reading.status = Some("ปกติ".to_string());
    reading.observed_at = Some("19/10/2569 08:30".to_string());
    reading
}

pub fn dam_reading(value: &str) -> Reading {
    let mut reading = Reading::new("chaophraya_dam", fixed_now());
    reading.primary_value = value.parse().ok();
    reading.primary_text = Some(value.to_string());
    reading
}

/// Notifier that records every notification and optionally rejects them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { sent: RefCell::new(Vec::new()), fail: true }
    }

    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn last_text(&self) -> Option<String> {
        self.sent.borrow().last().map(|n| n.text.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Http { status: 500, body: "down".to_string() });
        }
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
