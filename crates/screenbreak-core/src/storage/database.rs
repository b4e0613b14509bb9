//! SQLite-backed persistence.
//!
//! Provides persistent storage for:
//! - The break session record (`kv` table, one JSON scalar per key)
//! - Named alarms (`alarms` table), polled by the runtime

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::StoreError;
use crate::host::{Alarm, AlarmScheduler, AlarmSpec, StateStore, StoreValues};

use super::data_dir;

/// SQLite database for the session record and alarms.
///
/// The connection sits behind a mutex so one handle can serve as both the
/// store and the alarm facility of a coordinator.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data_dir>/screenbreak.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::open_at(dir.join("screenbreak.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(2))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database mutex poisoned".into()))
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alarms (
                name            TEXT PRIMARY KEY,
                scheduled_at_ms INTEGER NOT NULL,
                period_ms       INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_alarms_scheduled_at ON alarms(scheduled_at_ms);",
        )?;
        Ok(())
    }

    /// Get a raw value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a raw value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Every alarm, soonest first.
    pub fn alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name, scheduled_at_ms, period_ms FROM alarms ORDER BY scheduled_at_ms",
        )?;
        let rows = stmt.query_map([], row_to_alarm)?;
        let mut alarms = Vec::new();
        for row in rows {
            alarms.push(row?);
        }
        Ok(alarms)
    }
}

fn row_to_alarm(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alarm> {
    Ok(Alarm {
        name: row.get(0)?,
        scheduled_at_ms: row.get(1)?,
        period_ms: row.get(2)?,
    })
}

impl StateStore for Database {
    fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut values = StoreValues::new();
        for key in keys {
            let raw = stmt
                .query_row(params![key], |row| row.get::<_, String>(0))
                .optional()?;
            let Some(raw) = raw else { continue };
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    values.insert((*key).to_string(), value);
                }
                Err(e) => {
                    tracing::warn!(key = *key, error = %e, "ignoring undecodable stored value");
                }
            }
        }
        Ok(values)
    }

    fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in &values {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl AlarmScheduler for Database {
    fn create(&self, name: &str, spec: AlarmSpec, now_ms: u64) -> Result<Alarm, StoreError> {
        let alarm = Alarm {
            name: name.to_string(),
            scheduled_at_ms: spec.first_fire_at(now_ms),
            period_ms: spec.period_ms,
        };
        self.lock()?.execute(
            "INSERT OR REPLACE INTO alarms (name, scheduled_at_ms, period_ms) VALUES (?1, ?2, ?3)",
            params![alarm.name, alarm.scheduled_at_ms, alarm.period_ms],
        )?;
        Ok(alarm)
    }

    fn clear(&self, name: &str) -> Result<bool, StoreError> {
        let removed = self
            .lock()?
            .execute("DELETE FROM alarms WHERE name = ?1", params![name])?;
        Ok(removed > 0)
    }

    fn get(&self, name: &str) -> Result<Option<Alarm>, StoreError> {
        let conn = self.lock()?;
        let alarm = conn
            .query_row(
                "SELECT name, scheduled_at_ms, period_ms FROM alarms WHERE name = ?1",
                params![name],
                row_to_alarm,
            )
            .optional()?;
        Ok(alarm)
    }

    fn take_due(&self, now_ms: u64) -> Result<Vec<Alarm>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let due = {
            let mut stmt = tx.prepare(
                "SELECT name, scheduled_at_ms, period_ms FROM alarms
                 WHERE scheduled_at_ms <= ?1
                 ORDER BY scheduled_at_ms",
            )?;
            let rows = stmt.query_map(params![now_ms], row_to_alarm)?;
            let mut due = Vec::new();
            for row in rows {
                due.push(row?);
            }
            due
        };

        for alarm in &due {
            match alarm.next_after(now_ms) {
                Some(next) => {
                    tx.execute(
                        "UPDATE alarms SET scheduled_at_ms = ?2 WHERE name = ?1",
                        params![alarm.name, next],
                    )?;
                }
                None => {
                    tx.execute("DELETE FROM alarms WHERE name = ?1", params![alarm.name])?;
                }
            }
        }
        tx.commit()?;
        Ok(due)
    }
}
