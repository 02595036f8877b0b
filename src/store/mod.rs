//! Row store contract
//!
//! The registry and the settings manager only talk to storage through these
//! traits. [`SqliteStore`] is the production backend.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;

/// A persisted timer row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRow {
    pub id: i64,
    pub timer_type: Option<String>,
    pub name: String,
    pub description: String,
    pub duration_ms: Option<i64>,
    pub weight: i64,
    pub text_alert: bool,
    pub audio_alert: bool,
    pub show_on_web: bool,
}

/// Values for a row about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimerRow {
    pub timer_type: String,
    pub name: String,
    pub description: String,
    pub duration_ms: Option<i64>,
    pub weight: i64,
    pub text_alert: bool,
    pub audio_alert: bool,
    pub show_on_web: bool,
}

/// Partial row update; only present fields are written.
///
/// `duration_ms: Some(None)` writes `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPatch {
    pub timer_type: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_ms: Option<Option<i64>>,
    pub text_alert: Option<bool>,
    pub audio_alert: Option<bool>,
    pub show_on_web: Option<bool>,
}

impl RowPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub trait TimerStore: Send {
    /// All rows ordered by `(Weight, ID)`
    fn select_all(&self) -> Result<Vec<TimerRow>, StoreError>;

    /// Insert a row and return its generated ID
    fn insert(&mut self, row: &NewTimerRow) -> Result<i64, StoreError>;

    /// Returns `false` when no row has this ID
    fn update_fields(&mut self, id: i64, patch: &RowPatch) -> Result<bool, StoreError>;

    fn update_weight(&mut self, id: i64, weight: i64) -> Result<bool, StoreError>;

    /// Returns `false` when no row has this ID
    fn delete(&mut self, id: i64) -> Result<bool, StoreError>;
}

pub trait SettingsStore: Send {
    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}
