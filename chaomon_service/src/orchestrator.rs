//! One polling run per flow.
//!
//! Every flow walks the same phases:
//!
//! ```text
//! LoadState → Fetch → Parse → Evaluate → (Notify)? → LogAppend → PersistState → Done
//! ```
//!
//! A failed fetch or parse skips straight to a placeholder `LogAppend` and
//! ends the run there, so each run leaves exactly one log line (or, for the
//! forecast snapshot, one rewritten file) whatever happens upstream. Only
//! local storage errors are returned to the caller.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset};

use crate::alert::format::{self, YearAgo};
use crate::alert::thresholds::LevelDecision;
use crate::alert::{change, classifier, cooldown, thresholds};
use crate::config::Config;
use crate::history::{HistoricalLog, field_or_na, nearest_record, placeholders};
use crate::ingest::SourceAdapter;
use crate::logging::log_source_failure;
use crate::model::{Reading, SourceError, WeatherEvent, WeatherSnapshot};
use crate::notify::{Notification, Notifier};
use crate::state::{AlertState, BridgeState, DamState, StateStore, StoreError};
use crate::stations::{self, Station, StationId};

// ---------------------------------------------------------------------------
// Log stream layouts (fields after the timestamp)
// ---------------------------------------------------------------------------

/// `timestamp,storage` with storage as `"<value> cms"`.
pub const DAM_FIELDS: usize = 1;
pub const DAM_STORAGE: usize = 0;

/// `timestamp,water_level,bank_level,status,below_bank,source_time`.
pub const BRIDGE_FIELDS: usize = 5;
pub const BRIDGE_WATER_LEVEL: usize = 0;

/// `occurrence_time,category,rain_3h,pop,temp_max,clouds`.
pub const WEATHER_FIELDS: usize = 5;
pub const WEATHER_CATEGORY: usize = 0;
pub const WEATHER_RAIN_3H: usize = 1;
pub const WEATHER_TEMP_MAX: usize = 3;

/// Unit suffix written after the dam storage figure.
pub const DAM_UNIT: &str = "cms";

/// Historical comparison for dam alerts: the record nearest to one year ago.
const YEAR_AGO_DAYS: i64 = 365;
const YEAR_AGO_TOLERANCE_HOURS: i64 = 12;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadState,
    Fetch,
    Parse,
    Evaluate,
    Notify,
    LogAppend,
    PersistState,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::LoadState => "LOAD_STATE",
            Phase::Fetch => "FETCH",
            Phase::Parse => "PARSE",
            Phase::Evaluate => "EVALUATE",
            Phase::Notify => "NOTIFY",
            Phase::LogAppend => "LOG_APPEND",
            Phase::PersistState => "PERSIST_STATE",
            Phase::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// What the evaluator concluded, per flow.
#[derive(Debug, Clone, PartialEq)]
pub enum RunDecision {
    /// Nothing was evaluated (degraded run).
    Skipped,
    Level(LevelDecision),
    Changed { value: String, changed: bool },
    Weather { event: Option<WeatherEvent>, suppressed: bool },
}

impl RunDecision {
    /// True when the evaluator asked for a notification.
    pub fn wants_alert(&self) -> bool {
        match self {
            RunDecision::Skipped => false,
            RunDecision::Level(d) => d.notify,
            RunDecision::Changed { changed, .. } => *changed,
            RunDecision::Weather { event, suppressed } => event.is_some() && !suppressed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Last phase the run reached.
    pub phase: Phase,
    pub notified: bool,
    /// Fetch or parse failed; a placeholder was logged.
    pub degraded: bool,
    /// An alert was wanted but the notifier rejected it.
    pub delivery_failed: bool,
    pub decision: RunDecision,
}

impl RunReport {
    fn degraded() -> Self {
        Self {
            phase: Phase::LogAppend,
            notified: false,
            degraded: true,
            delivery_failed: false,
            decision: RunDecision::Skipped,
        }
    }
}

fn enter(flow: &str, phase: Phase) {
    tracing::debug!(flow, phase = %phase, "phase");
}

/// Sends and reports whether delivery succeeded. Failures are logged here.
fn deliver(notifier: &dyn Notifier, notification: &Notification, flow: &str) -> bool {
    match notifier.notify(notification) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(flow, channel = %notifier.channel(), "alert delivery failed: {}", e);
            false
        }
    }
}

fn log_for(config: &Config, station: &Station) -> HistoricalLog {
    HistoricalLog::new(config.data_path(station.log_file))
}

fn store_for<T>(config: &Config, station: &Station) -> StateStore<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Default,
{
    StateStore::new(config.data_path(station.state_file))
}

fn fetch_failed(flow: &str, adapter_source: crate::logging::DataSource, station: &str, err: &SourceError) {
    log_source_failure(adapter_source, station, "fetch", err);
    tracing::warn!(flow, "source unavailable, logging placeholder");
}

// ---------------------------------------------------------------------------
// Bridge water level
// ---------------------------------------------------------------------------

/// Polls the bridge gauge and alerts on level changes of at least
/// `config.threshold_m`.
pub fn run_bridge(
    config: &Config,
    adapter: &dyn SourceAdapter<Output = Reading>,
    notifier: &dyn Notifier,
    now: DateTime<FixedOffset>,
) -> Result<RunReport, StoreError> {
    const FLOW: &str = "bridge";
    let _span = tracing::info_span!("run", flow = FLOW).entered();
    let station = stations::station(StationId::Inburi);
    let log = log_for(config, station);
    let store = store_for::<BridgeState>(config, station);

    enter(FLOW, Phase::LoadState);
    let previous = store.load();

    enter(FLOW, Phase::Fetch);
    let reading = match adapter.fetch() {
        Ok(reading) => reading,
        Err(e) => {
            fetch_failed(FLOW, adapter.source(), adapter.station_id(), &e);
            enter(FLOW, Phase::LogAppend);
            log.append_placeholder(now, BRIDGE_FIELDS)?;
            return Ok(RunReport::degraded());
        }
    };

    enter(FLOW, Phase::Parse);
    let Some(level) = reading.valid_primary() else {
        tracing::warn!(
            raw = reading.primary_text.as_deref().unwrap_or(""),
            "water level unavailable, keeping previous baseline"
        );
        enter(FLOW, Phase::LogAppend);
        log.append_placeholder(now, BRIDGE_FIELDS)?;
        return Ok(RunReport::degraded());
    };

    enter(FLOW, Phase::Evaluate);
    let decision = thresholds::evaluate(level, previous.water_level, config.threshold_m);
    match previous.water_level {
        None => tracing::info!(level, "no previous level, establishing baseline"),
        Some(prev) => tracing::info!(
            level,
            previous = prev,
            change = %decision.signed_magnitude(),
            notify = decision.notify,
            "level evaluated"
        ),
    }

    let mut notified = false;
    let mut delivery_failed = false;
    if decision.notify {
        enter(FLOW, Phase::Notify);
        let text = format::bridge_alert(station.name, &reading, &decision);
        notified = deliver(notifier, &Notification::text(text), FLOW);
        delivery_failed = !notified;
    }

    enter(FLOW, Phase::LogAppend);
    log.append(
        now,
        &[
            format!("{:.2}", level),
            field_or_na(reading.secondary_value.map(|v| format!("{:.2}", v))),
            field_or_na(reading.status.as_deref()),
            field_or_na(reading.below_bank().map(|v| format!("{:.2}", v))),
            field_or_na(reading.observed_at.as_deref()),
        ],
    )?;

    enter(FLOW, Phase::PersistState);
    if delivery_failed {
        tracing::warn!("alert not delivered, keeping previous baseline for retry");
    } else {
        store.save(&BridgeState::from_reading(&reading))?;
    }

    enter(FLOW, Phase::Done);
    Ok(RunReport {
        phase: Phase::Done,
        notified,
        degraded: false,
        delivery_failed,
        decision: RunDecision::Level(decision),
    })
}

// ---------------------------------------------------------------------------
// Dam storage
// ---------------------------------------------------------------------------

/// Polls the dam telemetry and alerts whenever the published figure changes.
pub fn run_dam(
    config: &Config,
    adapter: &dyn SourceAdapter<Output = Reading>,
    notifier: &dyn Notifier,
    now: DateTime<FixedOffset>,
) -> Result<RunReport, StoreError> {
    const FLOW: &str = "dam";
    let _span = tracing::info_span!("run", flow = FLOW).entered();
    let station = stations::station(StationId::ChaophrayaDam);
    let log = log_for(config, station);
    let store = store_for::<DamState>(config, station);

    enter(FLOW, Phase::LoadState);
    let previous = store.load();

    enter(FLOW, Phase::Fetch);
    let reading = match adapter.fetch() {
        Ok(reading) => reading,
        Err(e) => {
            fetch_failed(FLOW, adapter.source(), adapter.station_id(), &e);
            enter(FLOW, Phase::LogAppend);
            log.append_placeholder(now, DAM_FIELDS)?;
            return Ok(RunReport::degraded());
        }
    };

    enter(FLOW, Phase::Parse);
    let Some(value) = reading.primary_text.clone().filter(|v| !v.trim().is_empty()) else {
        tracing::warn!("storage value missing from reading");
        enter(FLOW, Phase::LogAppend);
        log.append_placeholder(now, DAM_FIELDS)?;
        return Ok(RunReport::degraded());
    };

    enter(FLOW, Phase::Evaluate);
    let changed = change::evaluate(&value, previous.last_value.as_deref());
    tracing::info!(
        current = %value,
        previous = previous.last_value.as_deref().unwrap_or("-"),
        changed,
        "storage evaluated"
    );

    let mut notified = false;
    let mut delivery_failed = false;
    if changed {
        enter(FLOW, Phase::Notify);
        let year_ago = year_ago_value(&log, now)?;
        let text = format::dam_alert(&value, previous.last_value.as_deref(), year_ago.as_ref(), now);
        notified = deliver(notifier, &Notification::text(text), FLOW);
        delivery_failed = !notified;
    }

    enter(FLOW, Phase::LogAppend);
    log.append(now, &[format!("{} {}", value, DAM_UNIT)])?;

    enter(FLOW, Phase::PersistState);
    if delivery_failed {
        tracing::warn!("alert not delivered, keeping previous value for retry");
    } else {
        store.save(&DamState {
            last_value: Some(value.clone()),
            updated_at: Some(now),
        })?;
    }

    enter(FLOW, Phase::Done);
    Ok(RunReport {
        phase: Phase::Done,
        notified,
        degraded: false,
        delivery_failed,
        decision: RunDecision::Changed { value, changed },
    })
}

fn year_ago_value(log: &HistoricalLog, now: DateTime<FixedOffset>) -> Result<Option<YearAgo>, StoreError> {
    let target = now - Duration::days(YEAR_AGO_DAYS);
    let records: Vec<_> = log
        .records()?
        .into_iter()
        .filter(|r| r.field(DAM_STORAGE).is_some())
        .collect();
    Ok(
        nearest_record(&records, target, Duration::hours(YEAR_AGO_TOLERANCE_HOURS)).and_then(|r| {
            r.field(DAM_STORAGE).map(|value| YearAgo {
                date: target,
                value: value.to_string(),
            })
        }),
    )
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Polls the forecast, rewrites the snapshot log and alerts on the
/// highest-priority event that survives the cooldown gate.
pub fn run_weather(
    config: &Config,
    adapter: &dyn SourceAdapter<Output = WeatherSnapshot>,
    notifier: &dyn Notifier,
    now: DateTime<FixedOffset>,
) -> Result<RunReport, StoreError> {
    const FLOW: &str = "weather";
    let _span = tracing::info_span!("run", flow = FLOW).entered();
    let station = stations::station(StationId::SingburiWeather);
    let log = log_for(config, station);
    let store = store_for::<AlertState>(config, station);

    enter(FLOW, Phase::LoadState);
    let mut state = store.load();

    enter(FLOW, Phase::Fetch);
    let snapshot = match adapter.fetch() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            fetch_failed(FLOW, adapter.source(), adapter.station_id(), &e);
            enter(FLOW, Phase::LogAppend);
            log.rewrite(&[(now, placeholders(WEATHER_FIELDS))])?;
            return Ok(RunReport::degraded());
        }
    };

    enter(FLOW, Phase::Parse);
    if snapshot.current.is_none() {
        tracing::debug!("no current conditions, scanning forecast only");
    }
    tracing::info!(entries = snapshot.entries.len(), "forecast received");

    enter(FLOW, Phase::Evaluate);
    let event = classifier::classify(snapshot.current.as_ref(), &snapshot.entries, &config.weather, now);
    let suppressed = event
        .as_ref()
        .is_some_and(|e| cooldown::should_suppress(e, &state, config.cooldown(), now));

    let mut notified = false;
    let mut delivery_failed = false;
    match &event {
        None => tracing::info!("no significant weather event in window"),
        Some(e) if suppressed => tracing::info!(kind = %e.kind, at = %e.occurrence_time, "suppressed by cooldown"),
        Some(e) => {
            enter(FLOW, Phase::Notify);
            let text = format::weather_alert(e, station.name);
            notified = deliver(notifier, &Notification::text(text), FLOW);
            if notified {
                cooldown::record_sent(e, &mut state, now);
            } else {
                delivery_failed = true;
            }
        }
    }

    enter(FLOW, Phase::LogAppend);
    let rows: Vec<_> = snapshot
        .entries
        .iter()
        .map(|entry| {
            (
                entry.time,
                vec![
                    entry.category.main.clone(),
                    format!("{:.1}", entry.rain_volume_3h),
                    format!("{:.2}", entry.precipitation_probability),
                    format!("{:.1}", entry.temp_max),
                    format!("{:.0}", entry.cloud_pct),
                ],
            )
        })
        .collect();
    if rows.is_empty() {
        log.rewrite(&[(now, placeholders(WEATHER_FIELDS))])?;
    } else {
        log.rewrite(&rows)?;
    }

    enter(FLOW, Phase::PersistState);
    store.save(&state)?;

    enter(FLOW, Phase::Done);
    Ok(RunReport {
        phase: Phase::Done,
        notified,
        degraded: false,
        delivery_failed,
        decision: RunDecision::Weather { event, suppressed },
    })
}
