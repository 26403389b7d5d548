use crate::error::{Result, StorageError};
use crate::TriggerStore;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use vigil_common::types::{CheckData, MetricValue, NotificationEvent};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS last_checks (
    trigger_id TEXT PRIMARY KEY,
    data TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS metric_values (
    metric TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (metric, timestamp)
);
CREATE TABLE IF NOT EXISTS pattern_metrics (
    pattern TEXT NOT NULL,
    metric TEXT NOT NULL,
    PRIMARY KEY (pattern, metric)
);
CREATE TABLE IF NOT EXISTS notification_events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,
    data TEXT NOT NULL
);
";

/// [`TriggerStore`] backed by a single SQLite database in WAL mode.
///
/// Checks and notification events are stored as JSON documents; raw values
/// and the pattern index are plain tables.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(format!("create {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.display(), "Opened trigger store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TriggerStore for SqliteStore {
    fn get_last_check(&self, trigger_id: &str) -> Result<Option<CheckData>> {
        let conn = self.lock();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM last_checks WHERE trigger_id = ?1",
                params![trigger_id],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn set_last_check(&self, trigger_id: &str, check: &CheckData) -> Result<()> {
        let data = serde_json::to_string(check)?;
        self.lock().execute(
            "INSERT INTO last_checks (trigger_id, data) VALUES (?1, ?2)
             ON CONFLICT(trigger_id) DO UPDATE SET data = excluded.data",
            params![trigger_id, data],
        )?;
        Ok(())
    }

    fn save_check(&self, trigger_id: &str, check: &CheckData, events: &[NotificationEvent]) -> Result<()> {
        let data = serde_json::to_string(check)?;
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO last_checks (trigger_id, data) VALUES (?1, ?2)
             ON CONFLICT(trigger_id) DO UPDATE SET data = excluded.data",
            params![trigger_id, data],
        )?;
        {
            let mut stmt = tx.prepare_cached("INSERT INTO notification_events (id, data) VALUES (?1, ?2)")?;
            for event in events {
                stmt.execute(params![event.id, serde_json::to_string(event)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_metric_value(&self, metric: &str, value: MetricValue) -> Result<()> {
        self.lock().execute(
            "INSERT OR REPLACE INTO metric_values (metric, timestamp, value) VALUES (?1, ?2, ?3)",
            params![metric, value.timestamp, value.value],
        )?;
        Ok(())
    }

    fn get_metric_values(&self, metric: &str, from: i64, until: i64) -> Result<Vec<MetricValue>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT timestamp, value FROM metric_values
             WHERE metric = ?1 AND timestamp >= ?2 AND timestamp <= ?3
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(params![metric, from, until], |row| {
            Ok(MetricValue {
                timestamp: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    fn remove_metric_values(&self, metric: &str, older_than: i64) -> Result<()> {
        let removed = self.lock().execute(
            "DELETE FROM metric_values WHERE metric = ?1 AND timestamp <= ?2",
            params![metric, older_than],
        )?;
        if removed > 0 {
            tracing::debug!(metric, removed, older_than, "Removed old metric values");
        }
        Ok(())
    }

    fn add_pattern_metric(&self, pattern: &str, metric: &str) -> Result<()> {
        self.lock().execute(
            "INSERT OR IGNORE INTO pattern_metrics (pattern, metric) VALUES (?1, ?2)",
            params![pattern, metric],
        )?;
        Ok(())
    }

    fn get_pattern_metrics(&self, pattern: &str) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT metric FROM pattern_metrics WHERE pattern = ?1 ORDER BY metric ASC",
        )?;
        let rows = stmt.query_map(params![pattern], |row| row.get::<_, String>(0))?;
        let mut metrics = Vec::new();
        for row in rows {
            metrics.push(row?);
        }
        Ok(metrics)
    }

    fn remove_patterns_metrics(&self, patterns: &[String]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM pattern_metrics WHERE pattern = ?1")?;
            for pattern in patterns {
                stmt.execute(params![pattern])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn push_notification_event(&self, event: &NotificationEvent) -> Result<()> {
        let data = serde_json::to_string(event)?;
        self.lock().execute(
            "INSERT INTO notification_events (id, data) VALUES (?1, ?2)",
            params![event.id, data],
        )?;
        Ok(())
    }

    fn fetch_notification_events(&self) -> Result<Vec<NotificationEvent>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut events = Vec::new();
        let mut last_seq = None;
        {
            let mut stmt = tx.prepare("SELECT seq, data FROM notification_events ORDER BY seq ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (seq, data) = row?;
                let event: NotificationEvent =
                    serde_json::from_str(&data).map_err(|e| StorageError::InvalidColumn {
                        column: "notification_events.data",
                        detail: e.to_string(),
                    })?;
                events.push(event);
                last_seq = Some(seq);
            }
        }
        if let Some(seq) = last_seq {
            tx.execute("DELETE FROM notification_events WHERE seq <= ?1", params![seq])?;
        }
        tx.commit()?;
        Ok(events)
    }
}
