//! SQLite backend for timer rows and settings

use std::path::Path;

use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{NewTimerRow, RowPatch, SettingsStore, TimerRow, TimerStore};
use crate::error::StoreError;

pub const SCHEMA_VERSION: i64 = 2;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and bring its schema up to date.
    ///
    /// The path `:memory:` opens an ephemeral database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        let mut current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchemaVersion {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        if current < 1 {
            debug!("Applying schema migration 1 (Timers, Settings)");
            self.conn
                .execute_batch(include_str!("../../migrations/0001_timers.sql"))?;
            self.conn.execute("PRAGMA user_version = 1", [])?;
            current = 1;
        }

        if current < 2 {
            debug!("Applying schema migration 2 (Timers.ShowOnWeb)");
            self.conn
                .execute_batch(include_str!("../../migrations/0002_show_on_web.sql"))?;
            self.conn.execute("PRAGMA user_version = 2", [])?;
            info!("Database schema at version {}", SCHEMA_VERSION);
        }

        Ok(())
    }
}

impl TimerStore for SqliteStore {
    fn select_all(&self) -> Result<Vec<TimerRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ID, Type, Name, Description, Duration, Weight, TextAlert, AudioAlert, ShowOnWeb
             FROM Timers ORDER BY Weight ASC, ID ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TimerRow {
                    id: row.get(0)?,
                    timer_type: row.get(1)?,
                    name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    duration_ms: row.get(4)?,
                    weight: row.get(5)?,
                    text_alert: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
                    audio_alert: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
                    show_on_web: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(&mut self, row: &NewTimerRow) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO Timers
                 (Type, Name, Description, Duration, Weight, TextAlert, AudioAlert, ShowOnWeb)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.timer_type,
                row.name,
                row.description,
                row.duration_ms,
                row.weight,
                row.text_alert,
                row.audio_alert,
                row.show_on_web,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_fields(&mut self, id: i64, patch: &RowPatch) -> Result<bool, StoreError> {
        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(timer_type) = &patch.timer_type {
            columns.push("Type");
            values.push(Value::Text(timer_type.clone()));
        }
        if let Some(name) = &patch.name {
            columns.push("Name");
            values.push(Value::Text(name.clone()));
        }
        if let Some(description) = &patch.description {
            columns.push("Description");
            values.push(Value::Text(description.clone()));
        }
        if let Some(duration_ms) = patch.duration_ms {
            columns.push("Duration");
            values.push(duration_ms.map(Value::Integer).unwrap_or(Value::Null));
        }
        if let Some(text_alert) = patch.text_alert {
            columns.push("TextAlert");
            values.push(Value::Integer(text_alert as i64));
        }
        if let Some(audio_alert) = patch.audio_alert {
            columns.push("AudioAlert");
            values.push(Value::Integer(audio_alert as i64));
        }
        if let Some(show_on_web) = patch.show_on_web {
            columns.push("ShowOnWeb");
            values.push(Value::Integer(show_on_web as i64));
        }

        if patch.is_empty() {
            let exists: Option<i64> = self
                .conn
                .query_row("SELECT ID FROM Timers WHERE ID = ?1", [id], |row| row.get(0))
                .optional()?;
            return Ok(exists.is_some());
        }

        let assignments = columns
            .iter()
            .map(|column| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE Timers SET {} WHERE ID = ?", assignments);
        values.push(Value::Integer(id));

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(changed > 0)
    }

    fn update_weight(&mut self, id: i64, weight: i64) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE Timers SET Weight = ?1 WHERE ID = ?2",
            params![weight, id],
        )?;
        Ok(changed > 0)
    }

    fn delete(&mut self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM Timers WHERE ID = ?1", params![id])?;
        Ok(changed > 0)
    }
}

impl SettingsStore for SqliteStore {
    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT Value FROM Settings WHERE Key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO Settings (Key, Value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_row(name: &str, weight: i64) -> NewTimerRow {
        NewTimerRow {
            timer_type: "COUNTDOWN".to_string(),
            name: name.to_string(),
            description: String::new(),
            duration_ms: Some(5_000),
            weight,
            text_alert: true,
            audio_alert: false,
            show_on_web: true,
        }
    }

    #[test]
    fn migrates_fresh_database_to_latest_version() {
        let store = SqliteStore::open_in_memory().expect("open store");
        assert_eq!(store.schema_version().expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn adds_show_on_web_column_to_version_one_databases() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("DB.sqlite");
        {
            let conn = Connection::open(&path).expect("open raw");
            conn.execute_batch(include_str!("../../migrations/0001_timers.sql"))
                .expect("v1 schema");
            conn.execute("PRAGMA user_version = 1", []).expect("set version");
            conn.execute(
                "INSERT INTO Timers (Type, Name, Duration, Weight)
                 VALUES ('TIMER', 'Legacy', 1000, 1)",
                [],
            )
            .expect("legacy row");
        }

        let store = SqliteStore::open(&path).expect("reopen");
        let rows = store.select_all().expect("select");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].show_on_web);
        assert_eq!(rows[0].description, "");
        assert!(!rows[0].text_alert);
    }

    #[test]
    fn rejects_newer_schema_versions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("DB.sqlite");
        {
            let conn = Connection::open(&path).expect("open raw");
            conn.execute("PRAGMA user_version = 9", []).expect("set version");
        }
        assert!(matches!(
            SqliteStore::open(&path),
            Err(StoreError::UnsupportedSchemaVersion { found: 9, .. })
        ));
    }

    #[test]
    fn selects_rows_ordered_by_weight_then_id() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let a = store.insert(&new_row("a", 5)).expect("insert");
        let b = store.insert(&new_row("b", 5)).expect("insert");
        let c = store.insert(&new_row("c", 2)).expect("insert");

        let ids: Vec<i64> = store.select_all().expect("select").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c, a, b]);
    }

    #[test]
    fn updates_only_present_fields() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let id = store.insert(&new_row("Doors", 1)).expect("insert");

        let patch = RowPatch {
            timer_type: Some("STOPWATCH".to_string()),
            duration_ms: Some(None),
            ..RowPatch::default()
        };
        assert!(store.update_fields(id, &patch).expect("update"));
        assert!(!store.update_fields(id + 100, &patch).expect("update missing"));

        let row = &store.select_all().expect("select")[0];
        assert_eq!(row.timer_type.as_deref(), Some("STOPWATCH"));
        assert_eq!(row.duration_ms, None);
        assert_eq!(row.name, "Doors");
        assert!(row.text_alert);
    }

    #[test]
    fn deletes_and_reports_missing_rows() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        let id = store.insert(&new_row("Doors", 1)).expect("insert");
        assert!(store.delete(id).expect("delete"));
        assert!(!store.delete(id).expect("delete again"));
    }

    #[test]
    fn stores_settings_by_key() {
        let mut store = SqliteStore::open_in_memory().expect("open store");
        assert_eq!(store.get_setting("OSC_PORT").expect("get"), None);
        store.set_setting("OSC_PORT", "9000").expect("set");
        store.set_setting("OSC_PORT", "9001").expect("overwrite");
        assert_eq!(store.get_setting("OSC_PORT").expect("get").as_deref(), Some("9001"));
    }
}
