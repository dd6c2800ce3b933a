// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font service: opens the store over the data directory and runs update
// batches, recording each in the audit trail.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use fontlayer_core::error::Result;
use fontlayer_core::outcome::{describe, result_code};
use fontlayer_core::traits::SystemClock;
use fontlayer_core::types::FontUpdateRequest;
use fontlayer_core::FontLayerSettings;
use fontlayer_security::{AuditEntry, AuditLog, MarkRegistry};
use fontlayer_store::{SfntFontParser, StaticBaseline, UpdatableFontDir};
use tracing::{error, info, warn};

const SETTINGS_FILE: &str = "settings.json";

/// The store plus the collaborators the CLI needs around it.
pub struct FontService {
    data_dir: PathBuf,
    settings: FontLayerSettings,
    dir: UpdatableFontDir,
    marks: Rc<MarkRegistry>,
    audit_log: Option<AuditLog>,
}

impl FontService {
    /// Open every subsystem under `data_dir` and load the font directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising font service");

        let settings = match load_settings(data_dir) {
            Some(settings) => settings,
            None => {
                let settings = FontLayerSettings::default();
                if let Err(e) = persist_settings(data_dir, &settings) {
                    warn!(error = %e, "could not write default settings");
                }
                settings
            }
        };
        let resolve = |path: &Path| FontLayerSettings::resolve(data_dir, path);

        let files_dir = resolve(&settings.files_dir);
        std::fs::create_dir_all(&files_dir)?;

        let keys = MarkRegistry::load_trusted_keys(&resolve(&settings.trusted_keys_dir))?;
        let marks = Rc::new(MarkRegistry::open(resolve(&settings.marks_db), keys)?);

        let baseline_path = resolve(&settings.baseline_file);
        let baseline = match StaticBaseline::from_file(&baseline_path) {
            Ok(baseline) => baseline,
            Err(e) => {
                warn!(path = %baseline_path.display(), error = %e, "no baseline catalogue, using an empty one");
                StaticBaseline::default()
            }
        };

        let mut dir = UpdatableFontDir::new(
            files_dir,
            resolve(&settings.config_file),
            SfntFontParser,
            Rc::clone(&marks),
            baseline,
            SystemClock,
        );
        dir.load_font_file_map();
        if let Err(e) = marks.prune_missing() {
            warn!(error = %e, "failed to prune integrity marks");
        }

        let audit_log = if settings.audit_enabled {
            Some(AuditLog::open(resolve(&settings.audit_db))?)
        } else {
            None
        };

        info!("font service initialised");
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            settings,
            dir,
            marks,
            audit_log,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> &FontLayerSettings {
        &self.settings
    }

    pub fn dir(&self) -> &UpdatableFontDir {
        &self.dir
    }

    /// Directory holding the trusted publisher keys.
    pub fn trusted_keys_dir(&self) -> PathBuf {
        FontLayerSettings::resolve(&self.data_dir, &self.settings.trusted_keys_dir)
    }

    /// Apply one update batch.  `subject` names the batch in the audit trail.
    pub fn update(&mut self, requests: &[FontUpdateRequest], subject: &str) -> Result<()> {
        let result = self.dir.update(requests);

        if let Err(e) = self.marks.prune_missing() {
            warn!(error = %e, "failed to prune integrity marks");
        }

        let details = result.as_ref().err().map(|e| describe(e).message);
        self.audit("update", subject, result_code(&result), details.as_deref());
        result
    }

    /// Record an audit entry, logging instead of failing.
    pub fn audit(&self, action: &str, subject: &str, result_code: i32, details: Option<&str>) {
        if let Some(log) = &self.audit_log {
            if let Err(e) = log.record(action, subject, result_code, details) {
                error!(error = %e, "failed to record audit entry");
            }
        }
    }

    /// Most recent audit entries, newest first.  Empty when auditing is off.
    pub fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        match &self.audit_log {
            Some(log) => log.recent_entries(limit),
            None => Ok(Vec::new()),
        }
    }
}

fn load_settings(data_dir: &Path) -> Option<FontLayerSettings> {
    let path = data_dir.join(SETTINGS_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "settings are malformed, using defaults");
            None
        }
    }
}

fn persist_settings(data_dir: &Path, settings: &FontLayerSettings) -> Result<()> {
    let path = data_dir.join(SETTINGS_FILE);
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontlayer_core::error::SystemFontErrorKind;
    use fontlayer_core::traits::IntegrityMarker;
    use fontlayer_core::types::{FamilyDefinition, FamilyFontRef, FontSource};
    use fontlayer_security::SigningKeyPair;

    /// A minimal TrueType font: a `head` table and a Windows Unicode `name`
    /// table carrying the family and PostScript names.
    fn truetype(postscript_name: &str, revision: u32) -> Vec<u8> {
        let utf16 = |text: &str| -> Vec<u8> {
            text.encode_utf16().flat_map(u16::to_be_bytes).collect()
        };
        let family = utf16("Fixture");
        let postscript = utf16(postscript_name);

        let mut head = vec![0u8; 54];
        head[..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[4..8].copy_from_slice(&revision.to_be_bytes());

        let mut name = Vec::new();
        name.extend_from_slice(&0u16.to_be_bytes()); // format
        name.extend_from_slice(&2u16.to_be_bytes()); // count
        name.extend_from_slice(&(6u16 + 2 * 12).to_be_bytes()); // storage offset
        for (name_id, offset, length) in [
            (1u16, 0usize, family.len()),
            (6u16, family.len(), postscript.len()),
        ] {
            for field in [3u16, 1, 0x0409, name_id, length as u16, offset as u16] {
                name.extend_from_slice(&field.to_be_bytes());
            }
        }
        name.extend_from_slice(&family);
        name.extend_from_slice(&postscript);

        // Table records must be sorted by tag.
        let tables: [(&[u8; 4], &[u8]); 2] = [(b"head", &head), (b"name", &name)];
        let mut font = Vec::new();
        font.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        font.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        font.extend_from_slice(&[0; 6]);
        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in tables {
            font.extend_from_slice(tag);
            font.extend_from_slice(&0u32.to_be_bytes()); // checksum
            font.extend_from_slice(&(offset as u32).to_be_bytes());
            font.extend_from_slice(&(data.len() as u32).to_be_bytes());
            offset += data.len();
        }
        for (_, data) in tables {
            font.extend_from_slice(data);
        }
        font
    }

    fn trust_new_key(root: &Path) -> SigningKeyPair {
        let key = SigningKeyPair::generate().expect("key");
        let keys_dir = root.join("keys");
        std::fs::create_dir_all(&keys_dir).expect("keys dir");
        std::fs::write(keys_dir.join("publisher.pub"), key.public_key()).expect("pub");
        key
    }

    #[test]
    fn open_empty_data_dir() {
        let root = tempfile::tempdir().expect("tempdir");
        let service = FontService::open(root.path()).expect("open");

        assert!(service.dir().records().is_empty());
        assert_eq!(service.dir().config_version(), 1);
        assert!(root.path().join(SETTINGS_FILE).exists());
        assert!(root.path().join("updatable_fonts").is_dir());
        assert!(service.dir().system_font_config().families.is_empty());
    }

    #[test]
    fn untrusted_signature_is_rejected_and_audited() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut service = FontService::open(root.path()).expect("open");

        let request = FontUpdateRequest::install(
            FontSource::Bytes(b"font bytes".to_vec()),
            b"not a signature".to_vec(),
        );
        let err = service.update(&[request], "font.ttf").expect_err("rejected");
        assert_eq!(err.kind(), Some(SystemFontErrorKind::VerificationFailure));

        let entries = service.recent_audit_entries(10).expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].result_code, -2);
        assert_eq!(entries[0].subject, "font.ttf");
        assert!(service.dir().records().is_empty());
    }

    #[test]
    fn signed_garbage_is_an_invalid_font() {
        let root = tempfile::tempdir().expect("tempdir");
        let key = trust_new_key(root.path());

        let mut service = FontService::open(root.path()).expect("open");
        let content = b"signed but not a font".to_vec();
        let signature = key.sign(&content).expect("sign");
        let err = service
            .update(&[FontUpdateRequest::install(FontSource::Bytes(content), signature)], "garbage")
            .expect_err("not a font");
        assert_eq!(err.kind(), Some(SystemFontErrorKind::InvalidFontFile));

        // The rolled-back slot took its mark with it.
        let slots = std::fs::read_dir(root.path().join("updatable_fonts")).expect("list").count();
        assert_eq!(slots, 0);
    }

    #[test]
    fn family_over_missing_font() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut service = FontService::open(root.path()).expect("open");

        let request = FontUpdateRequest::define_family(FamilyDefinition::new(
            "sans-serif",
            vec![FamilyFontRef::new("Missing-Regular")],
        ));
        let err = service.update(&[request], "sans-serif").expect_err("missing");
        assert_eq!(err.kind(), Some(SystemFontErrorKind::FontNotFound));
        assert_eq!(service.recent_audit_entries(1).expect("entries")[0].result_code, -9);
    }

    #[test]
    fn audit_can_be_disabled() {
        let root = tempfile::tempdir().expect("tempdir");
        let settings = FontLayerSettings {
            audit_enabled: false,
            ..FontLayerSettings::default()
        };
        persist_settings(root.path(), &settings).expect("settings");

        let mut service = FontService::open(root.path()).expect("open");
        assert!(!service.settings().audit_enabled);
        let request = FontUpdateRequest::define_family(FamilyDefinition::new("x", Vec::new()));
        service.update(&[request], "x").expect("empty family over no fonts");
        assert!(service.recent_audit_entries(10).expect("entries").is_empty());
        assert!(!root.path().join("audit.db").exists());
    }

    #[test]
    fn baseline_catalogue_is_served() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            root.path().join("baseline.json"),
            r#"{"families":[{"name":"sans-serif","fonts":[{"file":"/system/fonts/Roboto.ttf","postscript_name":"Roboto"}]}]}"#,
        )
        .expect("baseline");

        let service = FontService::open(root.path()).expect("open");
        let config = service.dir().system_font_config();
        assert_eq!(config.families.len(), 1);
        assert_eq!(config.config_version, 1);
    }

    #[test]
    fn signed_font_survives_reinstall_and_reopen() {
        let root = tempfile::tempdir().expect("tempdir");
        let key = trust_new_key(root.path());
        let font = truetype("Fixture-Regular", 0x0001_0000);
        let request = || {
            let signature = key.sign(&font).expect("sign");
            FontUpdateRequest::install(FontSource::Bytes(font.clone()), signature)
        };

        {
            let mut service = FontService::open(root.path()).expect("open");
            service.update(&[request()], "Fixture-Regular.ttf").expect("install");
            service.update(&[request()], "Fixture-Regular.ttf").expect("same revision");
            assert_eq!(service.dir().records().len(), 1);
        }

        let service = FontService::open(root.path()).expect("reopen");
        let records = service.dir().records();
        assert_eq!(records.len(), 1);
        let record = &records["Fixture-Regular"];
        assert_eq!(record.revision, 0x0001_0000);
        assert_eq!(
            record.path.file_name().and_then(|name| name.to_str()),
            Some("Fixture-Regular.ttf")
        );
        assert!(service.marks.has_mark(&record.path));
        assert_eq!(service.marks.count().expect("count"), 1);
        assert_eq!(service.dir().active_slots().len(), 1);

        let entries = service.recent_audit_entries(10).expect("entries");
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|entry| entry.result_code == 0));
    }

    #[test]
    fn stale_concurrency_setting_is_ignored() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::write(root.path().join(SETTINGS_FILE), r#"{"max_concurrent_updates": 0}"#)
            .expect("settings");

        let mut service = FontService::open(root.path()).expect("open");
        service.update(&[], "empty").expect("empty batch");
        assert_eq!(service.dir().config_version(), 2);
        assert_eq!(service.recent_audit_entries(1).expect("entries")[0].result_code, 0);
    }
}
