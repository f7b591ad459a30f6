//! Source Verification Module
//!
//! Fetches every configured source once, without touching logs or state,
//! and reports which ones are reachable and still shaped the way the
//! adapters expect. Run it after a source site redesign or when setting up
//! a new deployment.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::ingest::hii::HiiDamAdapter;
use crate::ingest::openweather::OpenWeatherAdapter;
use crate::ingest::thaiwater::ThaiWaterAdapter;
use crate::ingest::{SourceAdapter, page_fetcher};
use crate::model::{Reading, SourceError, WeatherSnapshot, now_bangkok};
use crate::stations::{self, StationId};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<SourceVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVerification {
    pub station_id: String,
    pub name: String,
    pub source: String,
    pub status: VerificationStatus,
    pub sample_data_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl SourceVerification {
    fn new<A: SourceAdapter + ?Sized>(adapter: &A) -> Self {
        let station_id = adapter.station_id().to_string();
        let name = match stations::find_station(&station_id) {
            Some(station) => station.name.to_string(),
            None => station_id.clone(),
        };
        Self {
            name,
            station_id,
            source: adapter.source().to_string(),
            status: VerificationStatus::Failed,
            sample_data_count: 0,
            error_message: None,
        }
    }
}

// ============================================================================
// Per-source checks
// ============================================================================

/// A station reading is a success when its primary value parsed, and a
/// partial success when the row was found but the value was unusable.
pub fn verify_reading(adapter: &dyn SourceAdapter<Output = Reading>) -> SourceVerification {
    let mut result = SourceVerification::new(adapter);
    match adapter.fetch() {
        Ok(reading) if reading.valid_primary().is_some() || reading.primary_text.is_some() => {
            result.sample_data_count = 1;
            result.status = if reading.valid_primary().is_some() {
                VerificationStatus::Success
            } else {
                VerificationStatus::PartialSuccess
            };
        }
        Ok(_) => {
            result.status = VerificationStatus::PartialSuccess;
            result.error_message = Some("station found but no value".to_string());
        }
        Err(e) => result.error_message = Some(e.to_string()),
    }
    result
}

/// A forecast is a success when both the slot list and the current
/// conditions came back.
pub fn verify_weather(adapter: &dyn SourceAdapter<Output = WeatherSnapshot>) -> SourceVerification {
    let mut result = SourceVerification::new(adapter);
    match adapter.fetch() {
        Ok(snapshot) => {
            result.sample_data_count = snapshot.entries.len();
            result.status = match (snapshot.entries.is_empty(), snapshot.current.is_some()) {
                (false, true) => VerificationStatus::Success,
                (false, false) => {
                    result.error_message = Some("current conditions unavailable".to_string());
                    VerificationStatus::PartialSuccess
                }
                (true, _) => {
                    result.error_message = Some("forecast list is empty".to_string());
                    VerificationStatus::PartialSuccess
                }
            };
        }
        Err(e) => result.error_message = Some(e.to_string()),
    }
    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

fn tally(report: &mut VerificationReport, result: SourceVerification) {
    print!("  {} ({}) ... ", result.station_id, result.source);
    match result.status {
        VerificationStatus::Success => {
            println!("✓ OK ({} samples)", result.sample_data_count);
            report.summary.working += 1;
        }
        VerificationStatus::PartialSuccess => {
            println!("⚠ Partial: {}", result.error_message.as_deref().unwrap_or("incomplete data"));
            report.summary.working += 1;
        }
        VerificationStatus::Failed => {
            println!("✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"));
            report.summary.failed += 1;
        }
    }
    report.summary.total += 1;
    report.results.push(result);
}

pub fn run_full_verification(config: &Config) -> Result<VerificationReport, SourceError> {
    let fetcher = page_fetcher(config)?;
    let mut report = VerificationReport {
        timestamp: now_bangkok().to_rfc3339(),
        results: Vec::new(),
        summary: VerificationSummary::default(),
    };

    println!("🔍 Verifying sources...");

    let dam = HiiDamAdapter::new(fetcher.as_ref(), config.dam_url.clone());
    tally(&mut report, verify_reading(&dam));

    let bridge = ThaiWaterAdapter::new(
        fetcher.as_ref(),
        config.bridge_url.clone(),
        stations::station(StationId::Inburi).name,
    );
    tally(&mut report, verify_reading(&bridge));

    let weather = OpenWeatherAdapter::from_config(config)?;
    tally(&mut report, verify_weather(&weather));

    tracing::debug!(working = report.summary.working, failed = report.summary.failed, "verification finished");
    Ok(report)
}

pub fn print_summary(report: &VerificationReport) {
    let rule = "═".repeat(60);
    println!("\n{}", rule);
    println!("📊 VERIFICATION SUMMARY");
    println!("{}", rule);
    println!();
    println!(
        "Sources:    {}/{} working  ({} failed)",
        report.summary.working, report.summary.total, report.summary.failed
    );

    let success_rate = if report.summary.total > 0 {
        (report.summary.working as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Overall Success Rate: {:.1}% ({}/{})",
        success_rate, report.summary.working, report.summary.total
    );
    println!("{}", rule);
}
