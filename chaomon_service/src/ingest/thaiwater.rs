/// thaiwater.net provincial water-level table.
///
/// The page renders one `<tr>` per station with a `<th scope="row">` header
/// holding the station name, followed by `<td>` cells:
///
/// | idx | content                         |
/// |-----|---------------------------------|
/// | 0   | location                        |
/// | 1   | water level (m MSL)             |
/// | 2   | bank level (m MSL)              |
/// | 3-5 | capacity / trend columns        |
/// | 6   | report time, source formatted   |
///
/// plus a `<span class="badge">` carrying the status text.

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use super::{PageFetcher, SourceAdapter};
use crate::logging::DataSource;
use crate::model::{Reading, SourceError, now_bangkok};
use crate::stations::STATION_INBURI;

const COL_WATER_LEVEL: usize = 1;
const COL_BANK_LEVEL: usize = 2;
const COL_REPORT_TIME: usize = 6;

/// Adapter for one station row of the water-level table.
pub struct ThaiWaterAdapter<'a> {
    fetcher: &'a dyn PageFetcher,
    url: String,
    station_name: String,
}

impl<'a> ThaiWaterAdapter<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, url: impl Into<String>, station_name: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
            station_name: station_name.into(),
        }
    }
}

impl SourceAdapter for ThaiWaterAdapter<'_> {
    type Output = Reading;

    fn source(&self) -> DataSource {
        DataSource::ThaiWater
    }

    fn station_id(&self) -> &str {
        STATION_INBURI
    }

    fn fetch(&self) -> Result<Reading, SourceError> {
        let html = self.fetcher.fetch_page(&self.url)?;
        tracing::debug!(bytes = html.len(), url = %self.url, "fetched station table");
        parse_station_row(&html, &self.station_name, now_bangkok())
    }
}

/// Extracts the reading for `station_name` from the rendered table.
///
/// # Errors
/// - `StationNotFound`: no row header contains the station name.
/// - `Parse`: the row exists but has too few cells.
///
/// A non-numeric level is not an error: the reading comes back with the
/// value absent.
pub fn parse_station_row(
    html: &str,
    station_name: &str,
    fetched_at: DateTime<FixedOffset>,
) -> Result<Reading, SourceError> {
    let row_re = regex(r"(?is)<tr\b[^>]*>(.*?)</tr>")?;
    let header_re = regex(r#"(?is)<th\b[^>]*scope\s*=\s*["']row["'][^>]*>(.*?)</th>"#)?;
    let cell_re = regex(r"(?is)<td\b[^>]*>(.*?)</td>")?;
    let badge_re = regex(r#"(?is)<span\b[^>]*class\s*=\s*["'][^"']*\bbadge\b[^"']*["'][^>]*>(.*?)</span>"#)?;
    let tag_re = regex(r"(?s)<[^>]*>")?;

    for row in row_re.captures_iter(html) {
        let row_html = &row[1];
        let Some(header) = header_re.captures(row_html) else {
            continue;
        };
        if !clean_text(&tag_re, &header[1]).contains(station_name) {
            continue;
        }

        let cells: Vec<String> = cell_re
            .captures_iter(row_html)
            .map(|c| clean_text(&tag_re, &c[1]))
            .collect();
        if cells.len() <= COL_BANK_LEVEL {
            return Err(SourceError::Parse(format!(
                "row for {} has {} cells, expected at least {}",
                station_name,
                cells.len(),
                COL_BANK_LEVEL + 1
            )));
        }

        let mut reading = Reading::new(STATION_INBURI, fetched_at);
        reading.primary_text = Some(cells[COL_WATER_LEVEL].clone());
        reading.primary_value = parse_level(&cells[COL_WATER_LEVEL]);
        reading.secondary_value = parse_level(&cells[COL_BANK_LEVEL]);
        reading.status = badge_re
            .captures(row_html)
            .map(|b| clean_text(&tag_re, &b[1]))
            .filter(|s| !s.is_empty());
        reading.observed_at = cells.get(COL_REPORT_TIME).cloned().filter(|s| !s.is_empty());

        if reading.primary_value.is_none() {
            tracing::warn!(station = station_name, raw = %cells[COL_WATER_LEVEL], "water level is not numeric");
        }
        return Ok(reading);
    }

    Err(SourceError::StationNotFound(station_name.to_string()))
}

/// Numeric level, or `None` for blanks, dashes and NaN.
fn parse_level(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn clean_text(tag_re: &Regex, html: &str) -> String {
    let text = tag_re.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn regex(pattern: &str) -> Result<Regex, SourceError> {
    Regex::new(pattern).map_err(|e| SourceError::Parse(format!("pattern {}: {}", pattern, e)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
