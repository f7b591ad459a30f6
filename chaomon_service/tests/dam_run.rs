/// Whole-run tests for the dam storage flow.

mod common;

use chaomon_service::model::SourceError;
use chaomon_service::orchestrator::{RunDecision, run_dam};
use chaomon_service::state::{DamState, StateStore};

use common::*;

fn log_path(dir: &std::path::Path) -> std::path::PathBuf {
    dir.join("historical_log.csv")
}

fn saved_value(dir: &std::path::Path) -> Option<String> {
    StateStore::<DamState>::new(dir.join("last_data.json")).load().last_value
}

#[test]
fn test_first_value_alerts_without_previous() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    let report = run_dam(&config, &dam_source(Ok(dam_reading("1234.5"))), &notifier, fixed_now()).unwrap();

    assert!(report.notified);
    assert_eq!(
        report.decision,
        RunDecision::Changed { value: "1234.5".to_string(), changed: true }
    );
    let text = notifier.last_text().unwrap();
    assert!(text.contains("╰─> 1234.5 cms"), "{}", text);
    assert!(text.contains("ไม่มีข้อมูลเดิม"), "{}", text);
    assert!(!text.contains("เทียบปีที่แล้ว"), "no year-ago line without history: {}", text);

    assert_eq!(read_lines(&log_path(dir.path())), vec!["2026-10-19T09:00:00+07:00,1234.5 cms"]);
    assert_eq!(saved_value(dir.path()).as_deref(), Some("1234.5"));
}

#[test]
fn test_unchanged_value_is_silent_but_logged() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    run_dam(&config, &dam_source(Ok(dam_reading("1234.5"))), &notifier, fixed_now()).unwrap();
    let report = run_dam(&config, &dam_source(Ok(dam_reading("1234.5"))), &notifier, hours_later(1)).unwrap();

    assert!(!report.notified);
    assert_eq!(notifier.count(), 1);
    assert_eq!(read_lines(&log_path(dir.path())).len(), 2);
}

#[test]
fn test_changed_value_shows_previous_and_year_ago() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        log_path(dir.path()),
        "2025-10-19T03:00:00+07:00,N/A\n2025-10-19T08:00:00+07:00,1100.0 cms\n",
    )
    .unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    run_dam(&config, &dam_source(Ok(dam_reading("1234.5"))), &notifier, fixed_now()).unwrap();
    run_dam(&config, &dam_source(Ok(dam_reading("1250.0"))), &notifier, hours_later(1)).unwrap();

    let text = notifier.last_text().unwrap();
    assert!(text.contains("╰─> 1250.0 cms"), "{}", text);
    assert!(text.contains("╰─> 1234.5 cms"), "{}", text);
    assert!(text.contains("📈 เทียบปีที่แล้ว (19/10/2025): 1100.0 cms"), "{}", text);
}

#[test]
fn test_fetch_failure_logs_placeholder_and_keeps_value() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let notifier = RecordingNotifier::default();

    run_dam(&config, &dam_source(Ok(dam_reading("1234.5"))), &notifier, fixed_now()).unwrap();
    let report = run_dam(
        &config,
        &dam_source(Err(SourceError::StationNotFound("C13".into()))),
        &notifier,
        hours_later(1),
    )
    .unwrap();

    assert!(report.degraded);
    let lines = read_lines(&log_path(dir.path()));
    assert_eq!(lines[1], "2026-10-19T10:00:00+07:00,N/A");
    assert_eq!(saved_value(dir.path()).as_deref(), Some("1234.5"));
}

#[test]
fn test_failed_delivery_is_retried_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let report = run_dam(&config, &dam_source(Ok(dam_reading("1234.5"))), &RecordingNotifier::failing(), fixed_now())
        .unwrap();
    assert!(report.delivery_failed);
    assert_eq!(saved_value(dir.path()), None);

    let notifier = RecordingNotifier::default();
    let report = run_dam(&config, &dam_source(Ok(dam_reading("1234.5"))), &notifier, hours_later(1)).unwrap();
    assert!(report.notified);
    assert_eq!(saved_value(dir.path()).as_deref(), Some("1234.5"));
}
