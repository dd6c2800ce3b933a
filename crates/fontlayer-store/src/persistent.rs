// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent config store.
//
// The config is a small JSON document:
//
//   {
//     "lastModifiedMillis": 1234567890,
//     "updatedFontDirs": ["~~3f2a...", "~~91c0..."],
//     "fontFamilies": [{"name": "sans", "fonts": [...]}]
//   }
//
// Writes go to a temporary file in the same directory which is then renamed
// over the canonical path, so readers only ever see a complete document.

use std::io::Write;
use std::path::Path;

use fontlayer_core::error::{FontLayerError, Result};
use fontlayer_core::types::FamilyDefinition;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Durable state of the updatable font directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistentConfig {
    pub last_modified_millis: i64,
    /// Active slot ids in commit order.
    pub updated_font_dirs: Vec<String>,
    /// Families defined by updates, oldest definition first.
    pub font_families: Vec<FamilyDefinition>,
}

/// Read the config at `path`.
///
/// A missing, unreadable or malformed file yields the empty default; a torn
/// or corrupted config must never be trusted.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read(path: &Path) -> PersistentConfig {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no persisted config, starting empty");
            return PersistentConfig::default();
        }
        Err(e) => {
            warn!(error = %e, "failed to read persisted config, starting empty");
            return PersistentConfig::default();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "persisted config is malformed, starting empty");
            PersistentConfig::default()
        }
    }
}

/// Atomically replace the config at `path`.
#[instrument(skip_all, fields(path = %path.display(), dirs = config.updated_font_dirs.len()))]
pub fn write(path: &Path, config: &PersistentConfig) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let bytes = serde_json::to_vec_pretty(config)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(&bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|err| FontLayerError::Io(err.error))?;

    #[cfg(unix)]
    {
        if let Ok(dir) = std::fs::File::open(dir) {
            let _ = dir.sync_all();
        }
    }

    debug!("persisted config written");
    Ok(())
}
