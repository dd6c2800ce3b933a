// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail: append-only SQLite log of every font update batch.
//
// Schema:
//   audit_log(
//     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp   TEXT    NOT NULL,   -- RFC 3339
//     action      TEXT    NOT NULL,   -- e.g. "update", "load", "keygen"
//     subject     TEXT    NOT NULL,   -- PostScript names, family names, or "system"
//     result_code INTEGER NOT NULL,   -- 0 = success, negative = failure code
//     details     TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use fontlayer_core::error::FontLayerError;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS audit_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT    NOT NULL,
    action      TEXT    NOT NULL,
    subject     TEXT    NOT NULL,
    result_code INTEGER NOT NULL,
    details     TEXT
);";

/// Convert a `rusqlite::Error` into a `FontLayerError::Database`.
fn db_err(e: rusqlite::Error) -> FontLayerError {
    FontLayerError::Database(e.to_string())
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub subject: String,
    pub result_code: i32,
    pub details: Option<String>,
}

impl AuditEntry {
    pub fn succeeded(&self) -> bool {
        self.result_code == 0
    }
}

/// Append-only audit log backed by a SQLite database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FontLayerError> {
        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, FontLayerError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Record a new audit entry.
    #[instrument(skip(self, details), fields(%action, %subject, result_code))]
    pub fn record(
        &self,
        action: &str,
        subject: &str,
        result_code: i32,
        details: Option<&str>,
    ) -> Result<(), FontLayerError> {
        let timestamp = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO audit_log (timestamp, action, subject, result_code, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, action, subject, result_code, details],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// Retrieve the most recent `limit` entries, ordered newest-first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, FontLayerError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, subject, result_code, details
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    subject: row.get(3)?,
                    result_code: row.get(4)?,
                    details: row.get(5)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Return the total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, FontLayerError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}
