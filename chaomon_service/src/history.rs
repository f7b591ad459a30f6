/// Append-only CSV log streams.
///
/// One line per poll: `timestamp,field,field,...` with no header, no quoting,
/// and `N/A` for unavailable fields. Timestamps are ISO 8601 with the Bangkok
/// offset. Writers append in wall-clock order, but readers never rely on it:
/// lookups scan every row and tolerate duplicates or out-of-order lines.
///
/// The forecast stream is the exception: it is a snapshot of the current
/// forecast and is truncated and rewritten on every poll via [`HistoricalLog::rewrite`].

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};

use crate::model::{NOT_AVAILABLE, bangkok};
use crate::state::StoreError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One parsed log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<FixedOffset>,
    /// Fields after the timestamp, verbatim.
    pub fields: Vec<String>,
}

impl LogRecord {
    /// The `index`-th field after the timestamp, or `None` if it is missing,
    /// empty or the `N/A` placeholder.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields
            .get(index)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty() && *f != NOT_AVAILABLE)
    }

    /// Numeric value of a field, ignoring a trailing unit word such as
    /// `cms` and thousands separators.
    pub fn number(&self, index: usize) -> Option<f64> {
        self.field(index).and_then(parse_measurement)
    }

    /// True when every field is unavailable (a placeholder line).
    pub fn is_placeholder(&self) -> bool {
        (0..self.fields.len()).all(|i| self.field(i).is_none())
    }
}

/// Parses `"1234.5"`, `"1,234.5"` or `"1234.5 cms"`. Non-finite results are
/// rejected.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    let number = raw.split_whitespace().next()?.replace(',', "");
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a log timestamp. Offset-less timestamps (older logs) are read as
/// Bangkok local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| naive.and_local_timezone(bangkok()).single())
}

/// Record whose timestamp is closest to `target`, within `tolerance` either
/// side. The first of equally close records wins.
pub fn nearest_record(
    records: &[LogRecord],
    target: DateTime<FixedOffset>,
    tolerance: Duration,
) -> Option<&LogRecord> {
    let mut best: Option<(&LogRecord, Duration)> = None;
    for record in records {
        let delta = record.timestamp - target;
        let diff = if delta < Duration::zero() { -delta } else { delta };
        if diff > tolerance {
            continue;
        }
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((record, diff)),
        }
    }
    best.map(|(record, _)| record)
}

/// Record with the greatest timestamp; the later line wins a tie.
pub fn latest_record(records: &[LogRecord]) -> Option<&LogRecord> {
    records.iter().max_by_key(|r| r.timestamp)
}

// ---------------------------------------------------------------------------
// Log file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HistoricalLog {
    path: PathBuf,
}

impl HistoricalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line. The line is built in memory and written with a
    /// single `write_all` so concurrent writers can interleave lines but
    /// never split one.
    pub fn append(&self, timestamp: DateTime<FixedOffset>, fields: &[String]) -> Result<(), StoreError> {
        let line = encode_line(timestamp, fields)?;
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(&line).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// Appends a line of `field_count` placeholders.
    pub fn append_placeholder(&self, timestamp: DateTime<FixedOffset>, field_count: usize) -> Result<(), StoreError> {
        self.append(timestamp, &placeholders(field_count))
    }

    /// Truncates the file and writes `rows` in order.
    pub fn rewrite(&self, rows: &[(DateTime<FixedOffset>, Vec<String>)]) -> Result<(), StoreError> {
        let mut body = Vec::new();
        for (timestamp, fields) in rows {
            body.extend(encode_line(*timestamp, fields)?);
        }
        self.ensure_parent()?;
        fs::write(&self.path, body).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// Every parseable line. A missing file is an empty log; lines with an
    /// unparseable timestamp are skipped.
    pub fn records(&self) -> Result<Vec<LogRecord>, StoreError> {
        let mut reader = match ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&self.path)
        {
            Ok(reader) => reader,
            Err(e) => {
                return match e.into_kind() {
                    csv::ErrorKind::Io(io) if io.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
                    csv::ErrorKind::Io(io) => Err(StoreError::io(&self.path, io)),
                    other => Err(StoreError::io(
                        &self.path,
                        io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", other)),
                    )),
                };
            }
        };

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            match row.get(0).and_then(parse_timestamp) {
                Some(timestamp) => records.push(LogRecord {
                    timestamp,
                    fields: row.iter().skip(1).map(str::to_string).collect(),
                }),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(path = %self.path.display(), skipped, "skipped unparseable log lines");
        }
        Ok(records)
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        Ok(())
    }
}

pub fn placeholders(field_count: usize) -> Vec<String> {
    vec![NOT_AVAILABLE.to_string(); field_count]
}

/// Formats an optional number for a log field.
pub fn field_or_na<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

/// Strips characters that would break the unquoted line format.
fn sanitize(field: &str) -> String {
    let cleaned: String = field
        .chars()
        .filter(|c| !matches!(c, ',' | '\n' | '\r'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        cleaned.to_string()
    }
}

fn encode_line(timestamp: DateTime<FixedOffset>, fields: &[String]) -> Result<Vec<u8>, StoreError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut row = Vec::with_capacity(fields.len() + 1);
    row.push(timestamp.to_rfc3339());
    row.extend(fields.iter().map(|f| sanitize(f)));

    writer
        .write_record(&row)
        .map_err(|e| StoreError::io(Path::new("<line>"), io::Error::other(e.to_string())))?;
    writer
        .into_inner()
        .map_err(|e| StoreError::io(Path::new("<line>"), e.into_error()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
