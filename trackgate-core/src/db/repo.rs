//! Database repository layer
//!
//! Provides query and insert operations for settings, tracker starts,
//! custom variables and hits.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A recorded `Tracker::start` call.
#[derive(Debug, Clone)]
pub struct TrackerStart {
    pub tracking_key: String,
    pub network_timeout_secs: u64,
    pub started_at: DateTime<Utc>,
}

/// Database handle (single connection shared behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Workers and the settings store write from different threads
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        // Statements are atomic, so a poisoned lock still guards a usable connection
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============================================
    // Settings
    // ============================================

    /// Read a raw setting value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connection();
        conn.query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(Error::from)
    }

    /// Insert or overwrite a setting value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ============================================
    // Tracker starts
    // ============================================

    /// Record that a tracker was started with the given settings
    pub fn record_tracker_start(&self, settings: &TrackerSettings) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO tracker_starts (tracking_key, network_timeout_secs, started_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                settings.tracking_key,
                settings.network_timeout.as_secs() as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent tracker start, if any
    pub fn latest_tracker_start(&self) -> Result<Option<TrackerStart>> {
        let conn = self.connection();
        conn.query_row(
            r#"
            SELECT tracking_key, network_timeout_secs, started_at
            FROM tracker_starts
            ORDER BY id DESC
            LIMIT 1
            "#,
            [],
            |row| {
                let timeout: i64 = row.get(1)?;
                Ok(TrackerStart {
                    tracking_key: row.get(0)?,
                    network_timeout_secs: timeout.max(0) as u64,
                    started_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // ============================================
    // Custom variables
    // ============================================

    /// Insert or replace the variable held in a slot
    pub fn upsert_custom_variable(&self, var: &CustomVariable) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO custom_variables (slot, name, value, scope, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(slot) DO UPDATE SET
                name = excluded.name,
                value = excluded.value,
                scope = excluded.scope,
                updated_at = excluded.updated_at
            "#,
            params![
                var.index,
                var.name,
                var.value,
                var.scope.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All custom variables ordered by slot
    pub fn list_custom_variables(&self) -> Result<Vec<CustomVariable>> {
        let conn = self.connection();
        let mut stmt =
            conn.prepare("SELECT slot, name, value, scope FROM custom_variables ORDER BY slot")?;
        let vars = stmt
            .query_map([], Self::row_to_custom_variable)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(vars)
    }

    fn row_to_custom_variable(row: &Row) -> rusqlite::Result<CustomVariable> {
        let scope_str: String = row.get("scope")?;
        Ok(CustomVariable {
            index: row.get("slot")?,
            name: row.get("name")?,
            value: row.get("value")?,
            scope: scope_str.parse().unwrap_or(VariableScope::Page),
        })
    }

    // ============================================
    // Hits
    // ============================================

    /// Persist a hit, returning its row id
    pub fn insert_hit(
        &self,
        tracking_key: &str,
        payload: &HitPayload,
        custom_variables: &serde_json::Value,
    ) -> Result<i64> {
        let (category, action, label, value, path) = match payload {
            HitPayload::Event(event) => (
                Some(event.category.as_str()),
                Some(event.action.as_str()),
                Some(event.label.as_str()),
                Some(event.value),
                None,
            ),
            HitPayload::PageView { path } => (None, None, None, None, Some(path.as_str())),
        };

        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO hits (
                kind, tracking_key, category, action, label, value, path,
                custom_variables, recorded_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                payload.kind().as_str(),
                tracking_key,
                category,
                action,
                label,
                value,
                path,
                custom_variables.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recently recorded hits, newest first
    pub fn list_recent_hits(&self, limit: usize) -> Result<Vec<StoredHit>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM hits
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;
        let hits = stmt
            .query_map([limit as i64], Self::row_to_hit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }

    /// Total number of recorded hits
    pub fn count_hits(&self) -> Result<i64> {
        let conn = self.connection();
        let count = conn.query_row("SELECT COUNT(*) FROM hits", [], |r| r.get(0))?;
        Ok(count)
    }

    fn row_to_hit(row: &Row) -> rusqlite::Result<StoredHit> {
        let kind_str: String = row.get("kind")?;
        let vars_str: Option<String> = row.get("custom_variables")?;
        let recorded_at_str: String = row.get("recorded_at")?;

        Ok(StoredHit {
            id: row.get("id")?,
            kind: kind_str.parse().unwrap_or(HitKind::Event),
            tracking_key: row.get("tracking_key")?,
            category: row.get("category")?,
            action: row.get("action")?,
            label: row.get("label")?,
            value: row.get("value")?,
            path: row.get("path")?,
            custom_variables: vars_str
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(serde_json::Value::Null),
            recorded_at: parse_datetime(&recorded_at_str),
        })
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
