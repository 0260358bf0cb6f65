//! Audit log: a history of ward events in SQLite.
//!
//! One database at `<data_root>/audit.db` serves every ward; each row
//! carries the ward it happened in, so `warded -w work audit` only sees
//! the `work` ward.  Rows hold passphrase names, counts and paths, never
//! secret values or keys.
//!
//! If the database can't be opened or written to, ward operations carry
//! on without a record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use crate::config::AUDIT_DB_FILE;
use crate::errors::{Result, WardedError};
use crate::ward::WardEvent;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS ward_events (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp   TEXT NOT NULL,
        ward        TEXT NOT NULL,
        operation   TEXT NOT NULL,
        secret_name TEXT,
        target      TEXT,
        details     TEXT
    );
    CREATE INDEX IF NOT EXISTS ward_events_by_ward ON ward_events (ward, id);
";

/// A recorded ward event.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub ward: String,
    pub operation: String,
    pub secret_name: Option<String>,
    /// Destination of a move or copy.
    pub target: Option<String>,
    pub details: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let ts: String = row.get(1)?;
        let timestamp = DateTime::parse_from_rfc3339(&ts)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: row.get(0)?,
            timestamp,
            ward: row.get(2)?,
            operation: row.get(3)?,
            secret_name: row.get(4)?,
            target: row.get(5)?,
            details: row.get(6)?,
        })
    }
}

/// Which events to read back, newest first.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    limit: usize,
    ward: Option<String>,
    secret: Option<String>,
    since: Option<DateTime<Utc>>,
}

impl AuditQuery {
    /// Up to `limit` events from any ward.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ward: None,
            secret: None,
            since: None,
        }
    }

    /// Only events in `ward`.
    pub fn ward(mut self, ward: &str) -> Self {
        self.ward = Some(ward.to_string());
        self
    }

    /// Only events touching `name` or anything under the folder `name/`,
    /// as either the source or the destination of a move or copy.
    pub fn secret(mut self, name: &str) -> Self {
        self.secret = Some(name.trim_end_matches('/').to_string());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(ward) = &self.ward {
            clauses.push("ward = ?");
            params.push(Value::Text(ward.clone()));
        }
        if let Some(name) = &self.secret {
            clauses.push(
                "(secret_name = ? OR instr(secret_name, ?) = 1 \
                 OR target = ? OR instr(target, ?) = 1)",
            );
            let folder = format!("{name}/");
            for _ in 0..2 {
                params.push(Value::Text(name.clone()));
                params.push(Value::Text(folder.clone()));
            }
        }
        if let Some(since) = &self.since {
            clauses.push("timestamp >= ?");
            params.push(Value::Text(since.to_rfc3339()));
        }

        let mut sql = String::from(
            "SELECT id, timestamp, ward, operation, secret_name, target, details \
             FROM ward_events",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id DESC LIMIT ?");
        params.push(Value::Integer(i64::try_from(self.limit).unwrap_or(i64::MAX)));

        (sql, params)
    }
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database under `data_root`.
    ///
    /// Returns `None` if the database can't be opened; callers treat
    /// that as "no audit log" and continue.
    pub fn open(data_root: &Path) -> Option<Self> {
        let db_path = Self::db_path(data_root);
        let conn = Connection::open(&db_path).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&db_path, std::fs::Permissions::from_mode(0o600));
        }

        conn.execute_batch(SCHEMA).ok()?;
        Some(Self { conn })
    }

    /// Record `event` against `ward`.  Errors are ignored.
    pub fn record(&self, ward: &str, event: &WardEvent<'_>) {
        let _ = self.conn.execute(
            "INSERT INTO ward_events (timestamp, ward, operation, secret_name, target, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                Utc::now().to_rfc3339(),
                ward,
                event.operation(),
                event.secret_name(),
                event.target(),
                event.details(),
            ],
        );
    }

    /// Events matching `query`, most recent first.
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let (sql, params) = query.to_sql();

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| WardedError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(params_from_iter(params.iter()), AuditEntry::from_row)
            .map_err(|e| WardedError::AuditError(format!("query exec: {e}")))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| WardedError::AuditError(format!("row parse: {e}")))
    }

    pub fn db_path(data_root: &Path) -> PathBuf {
        data_root.join(AUDIT_DB_FILE)
    }
}

/// Open the audit database, record one event and ignore any failure.
pub fn log_event(data_root: &Path, ward: &str, event: &WardEvent<'_>) {
    if let Some(audit) = AuditLog::open(data_root) {
        audit.record(ward, event);
    }
}
