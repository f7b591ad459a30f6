//! Notification text for each alert flow.
//!
//! Messages are read on phones in a LINE group, so they are short, Thai, and
//! laid out with emoji markers rather than tables.

use chrono::{DateTime, FixedOffset};

use super::thresholds::LevelDecision;
use crate::history::field_or_na;
use crate::model::{Direction, EventKind, NOT_AVAILABLE, Reading, WeatherEvent};

const RULE_HEAVY: &str = "══════════════════";
const RULE_LIGHT: &str = "───────────────";
const RULE_SHORT: &str = "━━━━━━━━";

/// `19/10/2026 14:00 น.`
pub fn thai_datetime(at: DateTime<FixedOffset>) -> String {
    at.format("%d/%m/%Y %H:%M น.").to_string()
}

fn arrow(direction: Option<Direction>) -> &'static str {
    match direction {
        Some(Direction::Rising) => "⬆️",
        Some(Direction::Falling) => "⬇️",
        None => "",
    }
}

/// Bridge water-level change.
pub fn bridge_alert(station_name: &str, reading: &Reading, decision: &LevelDecision) -> String {
    let status = reading.status.as_deref().unwrap_or(NOT_AVAILABLE);
    let time = reading.observed_at.as_deref().unwrap_or(NOT_AVAILABLE);
    format!(
        "📢 แจ้งระดับน้ำ {}{:.2} ม. ({})\n\
         {}\n\
         🌊 ระดับน้ำ     : {} ม.\n\
         🏞️ ระดับตลิ่ง    : {} ม.\n\
         🚦 สถานะ       : {}\n\
         📐 ห่างจากตลิ่ง : {} ม.\n\
         {}\n\
         🕒 เวลา        : {}",
        arrow(decision.direction),
        decision.magnitude,
        station_name,
        RULE_HEAVY,
        field_or_na(reading.valid_primary().map(|v| format!("{:.2}", v))),
        field_or_na(reading.secondary_value.map(|v| format!("{:.2}", v))),
        status,
        field_or_na(reading.below_bank().map(|v| format!("{:.2}", v))),
        RULE_LIGHT,
        time,
    )
}

/// Year-ago comparison attached to a dam alert.
#[derive(Debug, Clone, PartialEq)]
pub struct YearAgo {
    pub date: DateTime<FixedOffset>,
    pub value: String,
}

/// Dam storage change.
pub fn dam_alert(
    current: &str,
    previous: Option<&str>,
    year_ago: Option<&YearAgo>,
    now: DateTime<FixedOffset>,
) -> String {
    let mut text = format!(
        "🌊 แจ้งเตือนปริมาณน้ำ เขื่อนเจ้าพระยา\n\
         อ.สรรพยา จ.ชัยนาท\n\
         {rule}\n\
         💧 ปริมาณน้ำปัจจุบัน\n\
         ╰─> {current} cms\n\n\
         ⬅️ ค่าเดิมล่าสุด\n\
         ╰─> {previous}",
        rule = RULE_SHORT,
        current = current,
        previous = previous.map_or_else(|| "ไม่มีข้อมูลเดิม".to_string(), |p| format!("{} cms", p)),
    );
    if let Some(year_ago) = year_ago {
        text.push_str(&format!(
            "\n\n📈 เทียบปีที่แล้ว ({}): {}",
            year_ago.date.format("%d/%m/%Y"),
            year_ago.value
        ));
    }
    text.push_str(&format!("\n{}\n🗓️ {}", RULE_SHORT, thai_datetime(now)));
    text
}

/// Thai label for an event kind.
pub fn event_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::RainNow => "ฝนกำลังตก",
        EventKind::ForecastRain => "พยากรณ์ฝนตก",
        EventKind::HeatWave => "อากาศร้อนจัด",
        EventKind::NoSignificantEvent => "ไม่มีเหตุการณ์สำคัญ",
    }
}

/// Weather event alert.
pub fn weather_alert(event: &WeatherEvent, location: &str) -> String {
    let detail = match event.kind {
        EventKind::RainNow => format!(
            "🌧️ ขณะนี้มี{} ({})\n💧 ปริมาณฝน 1 ชม.: {:.1} มม.",
            if event.category.is_thunderstorm() { "พายุฝนฟ้าคะนอง" } else { "ฝนตก" },
            event.category.description,
            event.value
        ),
        EventKind::ForecastRain => format!(
            "☔ คาดว่าจะมี{} ({})\n💧 ปริมาณฝน 3 ชม.: {:.1} มม.",
            if event.category.is_thunderstorm() { "พายุฝนฟ้าคะนอง" } else { "ฝนตก" },
            event.category.description,
            event.value
        ),
        EventKind::HeatWave => format!("🔥 อุณหภูมิสูงสุดคาดการณ์: {:.1} °C", event.value),
        EventKind::NoSignificantEvent => "⛅ ไม่มีเหตุการณ์สำคัญ".to_string(),
    };
    format!(
        "📢 {} ({})\n{}\n{}\n{}\n🕒 เวลา: {}",
        event_label(event.kind),
        location,
        RULE_HEAVY,
        detail,
        RULE_LIGHT,
        thai_datetime(event.occurrence_time)
    )
}
