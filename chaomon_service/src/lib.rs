//! Chao Phraya basin monitor.
//!
//! Polls the In Buri bridge gauge, the Chao Phraya Dam telemetry and the
//! Sing Buri forecast, keeps flat-file logs of what it saw, and pushes
//! alerts and a daily summary to a LINE chat. Each invocation is one run;
//! scheduling is left to cron.

pub mod alert;
pub mod config;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod state;
pub mod stations;
pub mod summary;
pub mod verify;
