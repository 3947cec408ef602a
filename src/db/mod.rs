//! Database module for persisting battery state
//!
//! Everything is stored as JSON documents under a handful of keys:
//! - `settings`: user settings
//! - `batteryHistory`: rolling 7-day history
//! - `recentNotifications`: throttle log
//! - `lastBatteryState`: charging flag seen on the previous decision cycle

pub mod history;
pub mod settings;

use crate::core::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SETTINGS_KEY: &str = "settings";
pub const HISTORY_KEY: &str = "batteryHistory";
pub const NOTIFICATIONS_KEY: &str = "recentNotifications";
pub const LAST_STATE_KEY: &str = "lastBatteryState";

/// Opaque key-value persistence
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: &Value) -> Result<()>;
}

/// Typed access on top of [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Deserialize the value under `key`. Values of the wrong shape are logged and treated as absent.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };

        match serde_json::from_value(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                log::warn!("Ignoring unreadable value for '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    fn store<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, &value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// SQLite-backed store
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at the default location
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path()?;
        Self::open(&db_path)
    }

    /// Open (or create) a database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;

        log::debug!("Opened database at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get the database file path
    fn db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| Error::Database(rusqlite::Error::InvalidPath(PathBuf::new())))?;

        Ok(data_dir.join("batterysense").join("data.db"))
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|text| match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Corrupt JSON stored under '{}': {}", key, e);
                None
            }
        }))
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            r#"INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![key, text, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }
}

/// In-memory store for tests and the demo
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        self.values.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LastBatteryState;
    use serde_json::json;
    use tempfile::tempdir;

    fn create_test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let mut db = create_test_db();
        assert_eq!(db.get("missing").unwrap(), None);

        db.set("answer", &json!({ "value": 42 })).unwrap();
        assert_eq!(db.get("answer").unwrap(), Some(json!({ "value": 42 })));

        db.set("answer", &json!([1, 2, 3])).unwrap();
        assert_eq!(db.get("answer").unwrap(), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_corrupt_row_reads_as_absent() {
        let db = create_test_db();
        db.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, 0)",
                params![LAST_STATE_KEY, "{not json"],
            )
            .unwrap();

        assert_eq!(db.get(LAST_STATE_KEY).unwrap(), None);
    }

    #[test]
    fn test_typed_helpers() {
        let mut store = MemoryStore::new();
        let state = LastBatteryState {
            is_charging: true,
            percentage: 64.0,
        };
        store.store(LAST_STATE_KEY, &state).unwrap();
        assert_eq!(store.load::<LastBatteryState>(LAST_STATE_KEY).unwrap(), Some(state));
        assert_eq!(
            store.get(LAST_STATE_KEY).unwrap(),
            Some(json!({ "isCharging": true, "percentage": 64.0 }))
        );

        // wrong shape
        store.set(LAST_STATE_KEY, &json!("charging")).unwrap();
        assert_eq!(store.load::<LastBatteryState>(LAST_STATE_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");

        {
            let mut db = Database::open(&path).unwrap();
            db.set(SETTINGS_KEY, &json!({ "checkIntervalMinutes": 10 })).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get(SETTINGS_KEY).unwrap(),
            Some(json!({ "checkIntervalMinutes": 10 }))
        );
    }
}
