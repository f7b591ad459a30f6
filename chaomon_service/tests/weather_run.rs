/// Whole-run tests for the forecast flow: classification, cooldown and
/// the snapshot log.

mod common;

use chrono::{DateTime, Duration, FixedOffset};

use chaomon_service::model::{
    CurrentWeather, EventKind, ForecastEntry, SourceError, WeatherCategory, WeatherSnapshot,
};
use chaomon_service::orchestrator::{RunDecision, run_weather};
use chaomon_service::state::{AlertState, StateStore};

use common::*;

fn rain() -> WeatherCategory {
    WeatherCategory { id: Some(501), main: "Rain".into(), description: "moderate rain".into() }
}

fn clear() -> WeatherCategory {
    WeatherCategory { id: Some(800), main: "Clear".into(), description: "clear sky".into() }
}

fn entry(at: DateTime<FixedOffset>, category: WeatherCategory, pop: f64, rain_3h: f64, temp_max: f64) -> ForecastEntry {
    ForecastEntry {
        time: at,
        category,
        precipitation_probability: pop,
        rain_volume_3h: rain_3h,
        cloud_pct: 90.0,
        temp_max,
    }
}

fn snapshot(entries: Vec<ForecastEntry>) -> WeatherSnapshot {
    WeatherSnapshot { current: None, entries, fetched_at: fixed_now() }
}

fn alert_state(dir: &std::path::Path) -> AlertState {
    StateStore::<AlertState>::new(dir.join("weather_alert_state.json")).load()
}

fn event_kind(decision: &RunDecision) -> Option<EventKind> {
    match decision {
        RunDecision::Weather { event, .. } => event.as_ref().map(|e| e.kind),
        _ => None,
    }
}

#[test]
fn test_forecast_rain_alerts_and_records_occurrence() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();
    let slot = hours_later(2);

    let report = run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![entry(slot, rain(), 0.8, 6.0, 31.0)]))),
        &notifier,
        fixed_now(),
    )
    .unwrap();

    assert!(report.notified);
    assert_eq!(event_kind(&report.decision), Some(EventKind::ForecastRain));
    let text = notifier.last_text().unwrap();
    assert!(text.contains("ปริมาณฝน 3 ชม.: 6.0 มม."), "{}", text);

    let state = alert_state(dir.path());
    assert_eq!(state.last_alert_times.get(&EventKind::ForecastRain), Some(&fixed_now().timestamp()));
    assert_eq!(
        state.last_alerted_forecasts.get(&EventKind::ForecastRain).map(|f| f.occurrence_time),
        Some(slot.timestamp())
    );

    assert_eq!(
        read_lines(&dir.path().join("weather_log.csv")),
        vec!["2026-10-19T11:00:00+07:00,Rain,6.0,0.80,31.0,90"]
    );
}

#[test]
fn test_same_occurrence_within_cooldown_is_suppressed() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();
    let forecast = snapshot(vec![entry(hours_later(2), rain(), 0.8, 6.0, 31.0)]);

    run_weather(&config, &weather_source(Ok(forecast.clone())), &notifier, fixed_now()).unwrap();
    let report = run_weather(&config, &weather_source(Ok(forecast)), &notifier, hours_later(1)).unwrap();

    assert!(!report.notified);
    assert!(matches!(report.decision, RunDecision::Weather { suppressed: true, .. }));
    assert_eq!(notifier.count(), 1);
}

#[test]
fn test_later_occurrence_bypasses_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![entry(hours_later(2), rain(), 0.8, 6.0, 31.0)]))),
        &notifier,
        fixed_now(),
    )
    .unwrap();
    let report = run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![entry(hours_later(5), rain(), 0.9, 12.0, 30.0)]))),
        &notifier,
        hours_later(3),
    )
    .unwrap();

    assert!(report.notified, "a newer forecast slot is a new event");
    assert_eq!(notifier.count(), 2);
}

#[test]
fn test_rain_now_respects_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();
    let raining = |at: DateTime<FixedOffset>| WeatherSnapshot {
        current: Some(CurrentWeather { observed_at: at, category: rain(), rain_1h: Some(2.5), temp: Some(27.0) }),
        entries: vec![],
        fetched_at: at,
    };

    let first = run_weather(&config, &weather_source(Ok(raining(fixed_now()))), &notifier, fixed_now()).unwrap();
    assert_eq!(event_kind(&first.decision), Some(EventKind::RainNow));
    assert!(first.notified);

    let second = run_weather(&config, &weather_source(Ok(raining(hours_later(1)))), &notifier, hours_later(1)).unwrap();
    assert!(!second.notified);

    let later = fixed_now() + Duration::hours(7);
    let third = run_weather(&config, &weather_source(Ok(raining(later))), &notifier, later).unwrap();
    assert!(third.notified, "cooldown has elapsed");
}

#[test]
fn test_rain_beats_heat_in_same_slot() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    let report = run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![entry(hours_later(3), rain(), 0.7, 8.0, 37.0)]))),
        &notifier,
        fixed_now(),
    )
    .unwrap();
    assert_eq!(event_kind(&report.decision), Some(EventKind::ForecastRain));
}

#[test]
fn test_heat_wave_detected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    let report = run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![entry(hours_later(6), clear(), 0.0, 0.0, 38.5)]))),
        &notifier,
        fixed_now(),
    )
    .unwrap();
    assert_eq!(event_kind(&report.decision), Some(EventKind::HeatWave));
    assert!(notifier.last_text().unwrap().contains("38.5 °C"));
}

#[test]
fn test_slot_beyond_lookahead_is_ignored_but_logged() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    let report = run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![
            entry(hours_later(3), clear(), 0.0, 0.0, 30.0),
            entry(hours_later(25), rain(), 0.9, 20.0, 30.0),
        ]))),
        &notifier,
        fixed_now(),
    )
    .unwrap();

    assert_eq!(event_kind(&report.decision), None);
    assert_eq!(notifier.count(), 0);
    assert_eq!(read_lines(&dir.path().join("weather_log.csv")).len(), 2);
}

#[test]
fn test_fetch_failure_replaces_snapshot_with_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![
            entry(hours_later(3), clear(), 0.0, 0.0, 30.0),
            entry(hours_later(6), clear(), 0.0, 0.0, 31.0),
        ]))),
        &notifier,
        fixed_now(),
    )
    .unwrap();
    let report = run_weather(
        &config,
        &weather_source(Err(SourceError::MissingApiKey("OPENWEATHER_API_KEY".into()))),
        &notifier,
        hours_later(1),
    )
    .unwrap();

    assert!(report.degraded);
    assert_eq!(
        read_lines(&dir.path().join("weather_log.csv")),
        vec!["2026-10-19T10:00:00+07:00,N/A,N/A,N/A,N/A,N/A"]
    );
}

#[test]
fn test_failed_delivery_records_no_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let report = run_weather(
        &config,
        &weather_source(Ok(snapshot(vec![entry(hours_later(2), rain(), 0.8, 6.0, 31.0)]))),
        &RecordingNotifier::failing(),
        fixed_now(),
    )
    .unwrap();

    assert!(report.delivery_failed);
    let state = alert_state(dir.path());
    assert!(state.last_alert_times.is_empty());
    assert!(state.last_alerted_forecasts.is_empty());
}
