//! Weather event classification.
//!
//! Rules, highest priority first:
//! 1. Current conditions show rain or thunderstorm: `RainNow`.
//! 2. Scanning forecast slots in time order, the first slot inside the
//!    lookahead window that is either rainy enough (`ForecastRain`) or hot
//!    enough (`HeatWave`). Within one slot rain beats heat.
//!
//! An earlier qualifying slot always wins over a later, more severe one.

use chrono::{DateTime, FixedOffset};

use crate::config::WeatherThresholds;
use crate::model::{CurrentWeather, EventKind, ForecastEntry, WeatherEvent};

/// Picks the single event worth alerting on, if any.
///
/// Forecast slots earlier than `now` are skipped: they describe weather
/// that has already passed. A horizon beyond the representable date range
/// leaves the window open-ended.
pub fn classify(
    current: Option<&CurrentWeather>,
    entries: &[ForecastEntry],
    thresholds: &WeatherThresholds,
    now: DateTime<FixedOffset>,
) -> Option<WeatherEvent> {
    if let Some(event) = current.and_then(rain_now) {
        return Some(event);
    }

    let horizon = now.checked_add_signed(thresholds.lookahead());
    for entry in entries {
        if horizon.is_some_and(|h| entry.time > h) {
            break;
        }
        if entry.time < now {
            continue;
        }
        if let Some(event) = classify_entry(entry, thresholds) {
            return Some(event);
        }
    }
    None
}

fn rain_now(current: &CurrentWeather) -> Option<WeatherEvent> {
    if !current.category.is_rain_or_thunderstorm() {
        return None;
    }
    Some(WeatherEvent {
        kind: EventKind::RainNow,
        occurrence_time: current.observed_at,
        value: current.rain_1h.unwrap_or(0.0),
        category: current.category.clone(),
    })
}

fn classify_entry(entry: &ForecastEntry, thresholds: &WeatherThresholds) -> Option<WeatherEvent> {
    let rainy = entry.category.is_rain_or_thunderstorm()
        && entry.precipitation_probability >= thresholds.rain_pop
        && entry.rain_volume_3h >= thresholds.rain_min_mm;

    let (kind, value) = if rainy {
        (EventKind::ForecastRain, entry.rain_volume_3h)
    } else if entry.temp_max >= thresholds.heat_c {
        (EventKind::HeatWave, entry.temp_max)
    } else {
        return None;
    };

    Some(WeatherEvent {
        kind,
        occurrence_time: entry.time,
        value,
        category: entry.category.clone(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{WeatherCategory, bangkok};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<FixedOffset> {
        bangkok().with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn rain() -> WeatherCategory {
        WeatherCategory { id: Some(501), main: "Rain".into(), description: "moderate rain".into() }
    }

    fn clear() -> WeatherCategory {
        WeatherCategory { id: Some(800), main: "Clear".into(), description: "clear sky".into() }
    }

    fn entry(hours: i64, category: WeatherCategory, pop: f64, rain_3h: f64, temp_max: f64) -> ForecastEntry {
        ForecastEntry {
            time: now() + Duration::hours(hours),
            category,
            precipitation_probability: pop,
            rain_volume_3h: rain_3h,
            cloud_pct: 40.0,
            temp_max,
        }
    }

    fn thresholds() -> WeatherThresholds {
        WeatherThresholds::default()
    }

    #[test]
    fn test_rain_entry_two_hours_ahead_is_forecast_rain() {
        let entries = vec![entry(2, rain(), 0.5, 6.0, 30.0)];
        let event = classify(None, &entries, &thresholds(), now()).expect("should classify");
        assert_eq!(event.kind, EventKind::ForecastRain);
        assert_eq!(event.occurrence_time, now() + Duration::hours(2));
        assert_eq!(event.value, 6.0);
    }

    #[test]
    fn test_rain_beats_heat_in_the_same_slot() {
        let entries = vec![entry(3, rain(), 0.9, 12.0, 38.0)];
        let event = classify(None, &entries, &thresholds(), now()).unwrap();
        assert_eq!(event.kind, EventKind::ForecastRain, "rain has priority over heat");
    }

    #[test]
    fn test_earlier_heat_wins_over_later_heavier_rain() {
        let entries = vec![
            entry(3, clear(), 0.0, 0.0, 36.0),
            entry(6, rain(), 1.0, 40.0, 30.0),
        ];
        let event = classify(None, &entries, &thresholds(), now()).unwrap();
        assert_eq!(event.kind, EventKind::HeatWave);
        assert_eq!(event.value, 36.0);
    }

    #[test]
    fn test_rain_below_probability_or_volume_does_not_qualify() {
        let low_pop = vec![entry(3, rain(), 0.29, 20.0, 30.0)];
        assert_eq!(classify(None, &low_pop, &thresholds(), now()), None);

        let low_volume = vec![entry(3, rain(), 0.9, 4.9, 30.0)];
        assert_eq!(classify(None, &low_volume, &thresholds(), now()), None);
    }

    #[test]
    fn test_heavy_volume_without_rain_category_does_not_qualify() {
        let entries = vec![entry(3, clear(), 0.9, 20.0, 30.0)];
        assert_eq!(classify(None, &entries, &thresholds(), now()), None);
    }

    #[test]
    fn test_entry_beyond_lookahead_is_never_considered() {
        let entries = vec![entry(25, rain(), 1.0, 50.0, 40.0)];
        assert_eq!(
            classify(None, &entries, &thresholds(), now()),
            None,
            "slot at lookahead + 1h must be ignored"
        );
    }

    #[test]
    fn test_entry_exactly_at_lookahead_is_considered() {
        let entries = vec![entry(24, clear(), 0.0, 0.0, 35.0)];
        let event = classify(None, &entries, &thresholds(), now()).unwrap();
        assert_eq!(event.kind, EventKind::HeatWave);
    }

    #[test]
    fn test_past_slots_are_skipped() {
        let entries = vec![entry(-3, rain(), 1.0, 30.0, 30.0), entry(3, clear(), 0.0, 0.0, 30.0)];
        assert_eq!(classify(None, &entries, &thresholds(), now()), None);
    }

    #[test]
    fn test_current_rain_short_circuits_forecast() {
        let current = CurrentWeather {
            observed_at: now() - Duration::minutes(10),
            category: WeatherCategory { id: Some(211), main: "Thunderstorm".into(), description: String::new() },
            rain_1h: Some(4.2),
            temp: Some(28.0),
        };
        let entries = vec![entry(2, rain(), 0.9, 10.0, 30.0)];
        let event = classify(Some(&current), &entries, &thresholds(), now()).unwrap();
        assert_eq!(event.kind, EventKind::RainNow);
        assert_eq!(event.value, 4.2);
    }

    #[test]
    fn test_dry_current_conditions_fall_through_to_forecast() {
        let current = CurrentWeather {
            observed_at: now(),
            category: clear(),
            rain_1h: None,
            temp: Some(31.0),
        };
        let entries = vec![entry(2, rain(), 0.5, 6.0, 30.0)];
        let event = classify(Some(&current), &entries, &thresholds(), now()).unwrap();
        assert_eq!(event.kind, EventKind::ForecastRain);
    }

    #[test]
    fn test_unrepresentable_horizon_scans_every_future_slot() {
        let wide = WeatherThresholds { lookahead_hours: 1e10, ..WeatherThresholds::default() };
        let entries = vec![entry(-1, clear(), 0.0, 0.0, 40.0), entry(500, clear(), 0.0, 0.0, 36.0)];
        let event = classify(None, &entries, &wide, now()).unwrap();
        assert_eq!(event.kind, EventKind::HeatWave);
        assert_eq!(event.occurrence_time, now() + Duration::hours(500));
    }

    #[test]
    fn test_custom_thresholds_are_respected() {
        let strict = WeatherThresholds { heat_c: 37.0, ..WeatherThresholds::default() };
        let entries = vec![entry(3, clear(), 0.0, 0.0, 36.0)];
        assert_eq!(classify(None, &entries, &strict, now()), None);
    }
}
