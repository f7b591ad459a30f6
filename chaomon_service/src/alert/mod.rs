//! Alert decisions.
//!
//! Everything here is pure: inputs are readings, prior state and an
//! injected `now`; outputs are decisions and message text. The orchestrator
//! owns all I/O around it.

pub mod change;
pub mod classifier;
pub mod cooldown;
pub mod format;
pub mod staleness;
pub mod thresholds;
