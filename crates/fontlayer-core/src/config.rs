// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persistent settings describing where the store keeps its state.
///
/// Relative paths are resolved against the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontLayerSettings {
    /// Root of the updatable storage slots.
    pub files_dir: PathBuf,
    /// Persisted config (last-modified time, active slots, families).
    pub config_file: PathBuf,
    /// JSON description of the preinstalled fonts and families.
    pub baseline_file: PathBuf,
    /// SQLite registry of integrity marks.
    pub marks_db: PathBuf,
    /// Directory holding trusted public keys (`*.pub`, raw SEC1 bytes).
    pub trusted_keys_dir: PathBuf,
    /// Enable audit trail logging.
    pub audit_enabled: bool,
    /// SQLite audit trail.
    pub audit_db: PathBuf,
}

impl Default for FontLayerSettings {
    fn default() -> Self {
        Self {
            files_dir: PathBuf::from("updatable_fonts"),
            config_file: PathBuf::from("config.json"),
            baseline_file: PathBuf::from("baseline.json"),
            marks_db: PathBuf::from("marks.db"),
            trusted_keys_dir: PathBuf::from("keys"),
            audit_enabled: true,
            audit_db: PathBuf::from("audit.db"),
        }
    }
}

impl FontLayerSettings {
    /// Resolve a configured path against `data_dir`.
    pub fn resolve(data_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: FontLayerSettings =
            serde_json::from_str(r#"{"audit_enabled": false}"#).expect("parse");
        assert!(!settings.audit_enabled);
        assert_eq!(settings.files_dir, PathBuf::from("updatable_fonts"));
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let data = Path::new("/var/lib/fontlayer");
        assert_eq!(
            FontLayerSettings::resolve(data, Path::new("config.json")),
            PathBuf::from("/var/lib/fontlayer/config.json")
        );
        assert_eq!(
            FontLayerSettings::resolve(data, Path::new("/etc/baseline.json")),
            PathBuf::from("/etc/baseline.json")
        );
    }
}
