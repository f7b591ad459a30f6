/// HII dam telemetry page.
///
/// The Chao Phraya chart page embeds its data as a script literal,
/// `var json_data = [...];`, where `[0].itc_water.<code>.storage` is the
/// dam's current discharge, either a number or a formatted string such as
/// `"1,234.50"`.

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde_json::Value;

use super::{PageFetcher, SourceAdapter};
use crate::logging::DataSource;
use crate::model::{Reading, SourceError, now_bangkok};
use crate::stations::{DAM_TELEMETRY_CODE, STATION_CHAOPHRAYA_DAM};

pub struct HiiDamAdapter<'a> {
    fetcher: &'a dyn PageFetcher,
    url: String,
}

impl<'a> HiiDamAdapter<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, url: impl Into<String>) -> Self {
        Self { fetcher, url: url.into() }
    }
}

impl SourceAdapter for HiiDamAdapter<'_> {
    type Output = Reading;

    fn source(&self) -> DataSource {
        DataSource::Hii
    }

    fn station_id(&self) -> &str {
        STATION_CHAOPHRAYA_DAM
    }

    fn fetch(&self) -> Result<Reading, SourceError> {
        let html = self.fetcher.fetch_page(&self.url)?;
        parse_dam_page(&html, DAM_TELEMETRY_CODE, now_bangkok())
    }
}

/// Pulls the storage value for telemetry `code` out of the embedded JSON.
///
/// `primary_text` carries the value with thousands separators removed; it is
/// what the change detector compares.
pub fn parse_dam_page(
    html: &str,
    code: &str,
    fetched_at: DateTime<FixedOffset>,
) -> Result<Reading, SourceError> {
    let re = Regex::new(r"var json_data = (\[.*\]);")
        .map_err(|e| SourceError::Parse(e.to_string()))?;
    let literal = re
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| SourceError::Parse("json_data literal not found".into()))?;

    let data: Value = serde_json::from_str(literal.as_str())
        .map_err(|e| SourceError::Parse(format!("json_data: {}", e)))?;

    let station = data
        .get(0)
        .and_then(|d| d.get("itc_water"))
        .and_then(|w| w.get(code))
        .ok_or_else(|| SourceError::StationNotFound(code.to_string()))?;

    let text = match station.get("storage") {
        Some(Value::String(s)) => s.replace(',', "").trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(SourceError::NoDataAvailable(code.to_string()));
    }

    let mut reading = Reading::new(STATION_CHAOPHRAYA_DAM, fetched_at);
    reading.primary_value = text.parse::<f64>().ok().filter(|v| v.is_finite());
    reading.primary_text = Some(text);
    Ok(reading)
}
