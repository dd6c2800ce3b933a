// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Integrity-mark registry: a userspace stand-in for fs-verity.
//
// A file is marked only after its whole content verifies against one of the
// trusted publisher keys.  The registry stores the SHA-256 digest of the
// content that was verified, so a file swapped or edited after marking no
// longer counts as marked.
//
// Schema:
//   integrity_marks(
//     path      TEXT PRIMARY KEY,   -- absolute path of the marked file
//     digest    TEXT NOT NULL,      -- SHA-256 hex digest at marking time
//     marked_at TEXT NOT NULL       -- RFC 3339
//   )

use std::path::{Path, PathBuf};

use chrono::Utc;
use fontlayer_core::error::{FontLayerError, Result};
use fontlayer_core::traits::IntegrityMarker;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument, warn};

use crate::integrity::{hash_bytes, hash_file};
use crate::signing::verify_signature;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS integrity_marks (
    path      TEXT PRIMARY KEY,
    digest    TEXT NOT NULL,
    marked_at TEXT NOT NULL
);";

/// Convert a `rusqlite::Error` into a `FontLayerError::Database`.
fn db_err(e: rusqlite::Error) -> FontLayerError {
    FontLayerError::Database(e.to_string())
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Signature-gated integrity marks backed by SQLite.
pub struct MarkRegistry {
    conn: Connection,
    /// SEC1 public keys of trusted font publishers.
    trusted_keys: Vec<Vec<u8>>,
}

impl MarkRegistry {
    /// Open (or create) the registry database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), keys = trusted_keys.len()))]
    pub fn open(path: impl AsRef<Path>, trusted_keys: Vec<Vec<u8>>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("integrity mark registry opened");
        Ok(Self { conn, trusted_keys })
    }

    /// Open an in-memory registry (useful for tests).
    pub fn open_in_memory(trusted_keys: Vec<Vec<u8>>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;
        Ok(Self { conn, trusted_keys })
    }

    /// Load every `*.pub` file in `dir` as a trusted SEC1 public key.
    ///
    /// A missing directory yields no keys, which makes every install fail
    /// verification.
    pub fn load_trusted_keys(dir: &Path) -> Result<Vec<Vec<u8>>> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "trusted key directory missing");
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "pub"))
            .collect();
        paths.sort();

        let mut keys = Vec::with_capacity(paths.len());
        for path in paths {
            keys.push(std::fs::read(&path)?);
        }
        Ok(keys)
    }

    /// Digest recorded for `path`, if it is marked.
    pub fn recorded_digest(&self, path: &Path) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT digest FROM integrity_marks WHERE path = ?1",
                params![path_key(path)],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    /// Drop marks whose file no longer exists.  Returns how many were removed.
    pub fn prune_missing(&self) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM integrity_marks")
            .map_err(db_err)?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;

        let mut removed = 0;
        for path in paths.iter().filter(|p| !Path::new(p.as_str()).exists()) {
            removed += self
                .conn
                .execute("DELETE FROM integrity_marks WHERE path = ?1", params![path])
                .map_err(db_err)?;
        }
        if removed > 0 {
            info!(removed, "pruned marks of deleted files");
        }
        Ok(removed)
    }

    /// Number of marks currently recorded.
    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM integrity_marks", [], |row| row.get(0))
            .map_err(db_err)
    }
}

impl IntegrityMarker for MarkRegistry {
    #[instrument(skip(self, signature), fields(path = %path.display()))]
    fn set_up(&self, path: &Path, signature: &[u8]) -> Result<()> {
        let content = std::fs::read(path)?;
        let trusted = self
            .trusted_keys
            .iter()
            .any(|key| verify_signature(key, &content, signature).is_ok());
        if !trusted {
            return Err(FontLayerError::Signature(
                "no trusted key accepts the signature".into(),
            ));
        }

        self.conn
            .execute(
                "INSERT OR REPLACE INTO integrity_marks (path, digest, marked_at)
                 VALUES (?1, ?2, ?3)",
                params![path_key(path), hash_bytes(&content), Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;

        debug!("integrity mark recorded");
        Ok(())
    }

    fn has_mark(&self, path: &Path) -> bool {
        let recorded = match self.recorded_digest(path) {
            Ok(Some(digest)) => digest,
            Ok(None) => return false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "mark lookup failed");
                return false;
            }
        };
        hash_file(path).is_ok_and(|actual| actual == recorded)
    }

    #[instrument(skip(self), fields(from = %from.display(), to = %to.display()))]
    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let tx = self.conn.unchecked_transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM integrity_marks WHERE path = ?1",
            params![path_key(to)],
        )
        .map_err(db_err)?;
        let moved = tx
            .execute(
                "UPDATE integrity_marks SET path = ?1 WHERE path = ?2",
                params![path_key(to), path_key(from)],
            )
            .map_err(db_err)?;
        if moved == 0 {
            return Err(FontLayerError::Database(format!(
                "{} carries no integrity mark",
                from.display()
            )));
        }

        std::fs::rename(from, to)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}
