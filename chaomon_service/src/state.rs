//! Small persisted records between runs.
//!
//! One JSON file per flow, parameterized by the record shape. Loading never
//! fails: an absent file is a first run, and an unreadable or malformed file
//! is treated the same way (logged at WARN) so a corrupted state can only
//! cost one missed comparison, never a crashed run.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{EventKind, Reading};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// JSON-file-backed keyed record of type `T`.
#[derive(Debug, Clone)]
pub struct StateStore<T> {
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T> StateStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record, substituting `T::default()` for anything unusable.
    pub fn load(&self) -> T {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no state file, starting fresh");
                return T::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "state unreadable, starting fresh: {}", e);
                return T::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "state malformed, starting fresh: {}", e);
                T::default()
            }
        }
    }

    /// Overwrites the record. Writes a sibling temp file first and renames
    /// it over the old one, so a killed run leaves either the old or the new
    /// record on disk.
    pub fn save(&self, record: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(record)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Record shapes
// ---------------------------------------------------------------------------

/// Last dam storage value, compared by identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamState {
    pub last_value: Option<String>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// Last successfully parsed bridge reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeState {
    pub water_level: Option<f64>,
    pub bank_level: Option<f64>,
    pub status: Option<String>,
    pub below_bank: Option<f64>,
    pub time: Option<String>,
}

impl BridgeState {
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            water_level: reading.valid_primary(),
            bank_level: reading.secondary_value,
            status: reading.status.clone(),
            below_bank: reading.below_bank(),
            time: reading.observed_at.clone(),
        }
    }
}

/// The forecast occurrence an alert was last sent for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertedForecast {
    /// Epoch seconds of the forecast slot.
    pub occurrence_time: i64,
    pub value: f64,
}

/// Cooldown and dedup memory for the weather alerter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    /// Epoch seconds of the last sent alert, per kind.
    #[serde(default)]
    pub last_alert_times: BTreeMap<EventKind, i64>,
    #[serde(default)]
    pub last_alerted_forecasts: BTreeMap<EventKind, AlertedForecast>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
