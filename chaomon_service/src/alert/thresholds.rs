//! Water-level change threshold checking.
//!
//! The bridge flow compares each new level against the last good level and
//! notifies when the river has moved by at least the configured amount in
//! either direction. The first observation only establishes the baseline.

use crate::model::{Direction, round2};

/// Differences this close to the threshold count as reaching it. Levels are
/// published to the centimetre, so `1.40 - 1.30` must not fall short of 0.10.
const EPSILON: f64 = 1e-9;

/// Outcome of comparing one level against the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDecision {
    pub notify: bool,
    /// `None` only when there was nothing to compare against.
    pub direction: Option<Direction>,
    /// Absolute change, rounded to centimetres.
    pub magnitude: f64,
}

impl LevelDecision {
    fn baseline() -> Self {
        Self {
            notify: false,
            direction: None,
            magnitude: 0.0,
        }
    }

    /// `+0.20` / `-0.15`, or empty when there is no direction.
    pub fn signed_magnitude(&self) -> String {
        match self.direction {
            Some(d) => format!("{}{:.2}", d.sign(), self.magnitude),
            None => String::new(),
        }
    }
}

/// Decides whether a level change is worth a notification.
///
/// - `previous == None` never notifies.
/// - Otherwise notifies iff `|current - previous| >= threshold`.
/// - Direction is rising for a positive difference and falling otherwise.
pub fn evaluate(current: f64, previous: Option<f64>, threshold: f64) -> LevelDecision {
    let Some(previous) = previous.filter(|p| p.is_finite()) else {
        return LevelDecision::baseline();
    };

    let diff = current - previous;
    let direction = if diff > 0.0 { Direction::Rising } else { Direction::Falling };
    LevelDecision {
        notify: diff.abs() + EPSILON >= threshold,
        direction: Some(direction),
        magnitude: round2(diff.abs()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
