//! Alert deduplication and cooldown.
//!
//! A kind that alerted recently stays quiet for the cooldown window, unless
//! the forecast now points at a strictly later occurrence than the one last
//! announced. `RainNow` has no occurrence to advance and is always subject
//! to the cooldown.
//!
//! # Clock injection
//! Both functions take `now` rather than reading the clock, so the gate is
//! deterministic in tests.

use chrono::{DateTime, Duration, FixedOffset};

use crate::model::WeatherEvent;
use crate::state::{AlertState, AlertedForecast};

/// Returns `true` when `event` should not be sent this run.
pub fn should_suppress(
    event: &WeatherEvent,
    state: &AlertState,
    cooldown: Duration,
    now: DateTime<FixedOffset>,
) -> bool {
    let last_alert = state.last_alert_times.get(&event.kind).copied().unwrap_or(0);

    let bypass = event.kind.is_forecast() && {
        let prev_occurrence = state
            .last_alerted_forecasts
            .get(&event.kind)
            .map(|f| f.occurrence_time)
            .unwrap_or(0);
        event.occurrence_time.timestamp() > prev_occurrence
    };
    if bypass {
        return false;
    }

    now.timestamp() - last_alert < cooldown.num_seconds()
}

/// Records a delivered alert. Call only after the notifier reported success.
pub fn record_sent(event: &WeatherEvent, state: &mut AlertState, now: DateTime<FixedOffset>) {
    state.last_alert_times.insert(event.kind, now.timestamp());
    if event.kind.is_forecast() {
        state.last_alerted_forecasts.insert(
            event.kind,
            AlertedForecast {
                occurrence_time: event.occurrence_time.timestamp(),
                value: event.value,
            },
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
