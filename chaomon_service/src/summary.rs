//! Daily summary report.
//!
//! Built from the log streams alone: latest dam storage and its 24-hour
//! change, latest bridge level, and the next forecast slot. A source that
//! has gone quiet shows its last good figure with an age marker.

use chrono::{DateTime, Duration, FixedOffset};

use crate::alert::format::thai_datetime;
use crate::alert::staleness::{age_hours, is_stale_at};
use crate::config::Config;
use crate::history::{HistoricalLog, LogRecord, latest_record, nearest_record};
use crate::model::{bangkok, round2};
use crate::notify::{Notification, Notifier};
use crate::orchestrator::{
    BRIDGE_WATER_LEVEL, DAM_STORAGE, DAM_UNIT, WEATHER_CATEGORY, WEATHER_RAIN_3H, WEATHER_TEMP_MAX,
};
use crate::state::StoreError;
use crate::stations::{self, StationId};

/// Window around "24 hours before the latest dam record".
const DAY_CHANGE_TOLERANCE_HOURS: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSummary {
    pub value: f64,
    pub at: DateTime<FixedOffset>,
    /// Change versus the record nearest to 24 hours earlier.
    pub change_24h: Option<f64>,
    /// Age in hours when older than the staleness threshold.
    pub stale_hours: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSummary {
    pub at: DateTime<FixedOffset>,
    pub category: String,
    pub rain_3h: Option<f64>,
    pub temp_max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub generated_at: DateTime<FixedOffset>,
    pub dam: Option<ValueSummary>,
    pub bridge: Option<ValueSummary>,
    pub next_forecast: Option<ForecastSummary>,
}

impl DailySummary {
    /// Reads the three log streams under the configured data directory.
    pub fn collect(config: &Config, now: DateTime<FixedOffset>) -> Result<Self, StoreError> {
        let read = |id: StationId| HistoricalLog::new(config.data_path(stations::station(id).log_file)).records();

        let dam_records = read(StationId::ChaophrayaDam)?;
        let bridge_records = read(StationId::Inburi)?;
        let weather_records = read(StationId::SingburiWeather)?;

        Ok(Self {
            generated_at: now,
            dam: value_summary(&dam_records, DAM_STORAGE, true, config.stale_after(), now),
            bridge: value_summary(&bridge_records, BRIDGE_WATER_LEVEL, false, config.stale_after(), now),
            next_forecast: next_forecast(&weather_records, now),
        })
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            "📊 สรุปรายงานประจำวัน".to_string(),
            format!("🗓️ วันที่: {}", self.generated_at.format("%d/%m/%Y")),
            String::new(),
        ];

        lines.push(match &self.dam {
            Some(dam) => format!(
                "🌊 เขื่อนเจ้าพระยา: {:.1} {} ณ {}{}{}",
                dam.value,
                DAM_UNIT,
                clock(dam.at),
                dam.change_24h
                    .map(|c| format!(" ({:+.1} จาก 24 ชม.ก่อน)", c))
                    .unwrap_or_default(),
                stale_marker(dam.stale_hours),
            ),
            None => "🌊 เขื่อนเจ้าพระยา: ไม่มีข้อมูล".to_string(),
        });

        lines.push(match &self.bridge {
            Some(bridge) => format!(
                "🏞️ อินทร์บุรี: {:.2} ม. ณ {}{}",
                bridge.value,
                clock(bridge.at),
                stale_marker(bridge.stale_hours),
            ),
            None => "🏞️ อินทร์บุรี: ไม่มีข้อมูล".to_string(),
        });

        lines.push(String::new());
        lines.push(match &self.next_forecast {
            Some(f) => {
                let mut detail = Vec::new();
                if let Some(rain) = f.rain_3h {
                    detail.push(format!("ฝน {:.1} มม.", rain));
                }
                if let Some(temp) = f.temp_max {
                    detail.push(format!("{:.1} °C", temp));
                }
                let detail = if detail.is_empty() { String::new() } else { format!(" ({})", detail.join(", ")) };
                format!("⛅ ต่อไป: {} เวลา {}{}", f.category, thai_datetime(local(f.at)), detail)
            }
            None => "⛅ พยากรณ์อากาศ: ไม่มีเหตุการณ์สำคัญในอนาคตอันใกล้".to_string(),
        });

        lines.join("\n")
    }
}

fn local(at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    at.with_timezone(&bangkok())
}

fn clock(at: DateTime<FixedOffset>) -> String {
    local(at).format("%H:%M").to_string()
}

fn stale_marker(stale_hours: Option<i64>) -> String {
    stale_hours
        .map(|h| format!(" ⚠️ ข้อมูลเก่า {} ชม.", h))
        .unwrap_or_default()
}

/// Latest numeric value in `field`, ignoring placeholder and garbled rows.
fn value_summary(
    records: &[LogRecord],
    field: usize,
    with_day_change: bool,
    stale_after: Duration,
    now: DateTime<FixedOffset>,
) -> Option<ValueSummary> {
    let valid: Vec<LogRecord> = records
        .iter()
        .filter(|r| r.number(field).is_some())
        .cloned()
        .collect();
    let latest = latest_record(&valid)?;
    let value = latest.number(field)?;

    let change_24h = if with_day_change {
        nearest_record(
            &valid,
            latest.timestamp - Duration::hours(24),
            Duration::hours(DAY_CHANGE_TOLERANCE_HOURS),
        )
        .and_then(|r| r.number(field))
        .map(|earlier| round2(value - earlier))
    } else {
        None
    };

    let stale_hours = is_stale_at(latest.timestamp, stale_after, now).then(|| age_hours(latest.timestamp, now));

    Some(ValueSummary {
        value,
        at: latest.timestamp,
        change_24h,
        stale_hours,
    })
}

/// First non-placeholder forecast row strictly after `now`.
fn next_forecast(records: &[LogRecord], now: DateTime<FixedOffset>) -> Option<ForecastSummary> {
    records
        .iter()
        .filter(|r| r.timestamp > now && !r.is_placeholder())
        .min_by_key(|r| r.timestamp)
        .map(|r| ForecastSummary {
            at: r.timestamp,
            category: r.field(WEATHER_CATEGORY).unwrap_or("-").to_string(),
            rain_3h: r.number(WEATHER_RAIN_3H),
            temp_max: r.number(WEATHER_TEMP_MAX),
        })
}

/// Builds the summary and delivers it with the configured chart image.
/// Returns whether delivery succeeded.
pub fn run_summary(config: &Config, notifier: &dyn Notifier, now: DateTime<FixedOffset>) -> Result<bool, StoreError> {
    let summary = DailySummary::collect(config, now)?;
    let text = summary.render();
    tracing::info!(
        dam = summary.dam.is_some(),
        bridge = summary.bridge.is_some(),
        forecast = summary.next_forecast.is_some(),
        "daily summary built"
    );

    let notification = Notification::text(text).with_image(config.summary_image_url.clone());
    match notifier.notify(&notification) {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::error!("summary delivery failed: {}", e);
            Ok(false)
        }
    }
}
