// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Directory state loader.
//
// Rebuilds the in-memory state from the persisted config and the slots on
// disk.  Nothing on disk is trusted: a slot is kept only if every file in it
// carries an integrity mark and parses to the name it is stored under.
// Loading never fails; whatever cannot be trusted is deleted.

use std::collections::HashSet;
use std::path::Path;

use fontlayer_core::error::{FontLayerError, Result, SystemFontErrorKind};
use fontlayer_core::types::{FontConfig, FontFileRecord};
use tracing::{debug, info, instrument, warn};

use crate::dir::{DirState, UpdatableFontDir};
use crate::persistent;
use crate::slot::{self, Slot};

impl UpdatableFontDir {
    /// Populate the overlay state from disk.  Resets the config version to 1.
    #[instrument(skip_all, fields(files_dir = %self.files_dir.display()))]
    pub fn load_font_file_map(&mut self) {
        let persisted = persistent::read(&self.config_path);

        let mut seen = HashSet::new();
        let active: Vec<String> = persisted
            .updated_font_dirs
            .iter()
            .filter(|id| slot::is_slot_name(id) && seen.insert(id.as_str()))
            .cloned()
            .collect();

        self.collect_orphans(&active);

        let baseline = self.baseline();
        let mut state = DirState::default();
        for id in &active {
            let slot = Slot::open(&self.files_dir, id);
            match self.scan_slot(&slot) {
                Ok(records) => {
                    for record in records {
                        self.admit(&mut state, record, &baseline);
                    }
                    state.slots.push(id.clone());
                }
                Err(e) => {
                    warn!(slot = %id, error = %e, "untrusted slot, deleting");
                    slot.remove_best_effort();
                }
            }
        }

        let live = state.live_slots();
        for id in state.slots.iter().filter(|id| !live.contains(id)) {
            debug!(slot = %id, "slot no longer backs any font");
            Slot::open(&self.files_dir, id).remove_best_effort();
        }
        state.slots = live;

        for definition in persisted.font_families {
            if state.resolve(&definition).is_some() {
                state.define_family(definition);
            } else {
                warn!(family = ?definition.name, "dropping family with missing fonts");
            }
        }

        info!(
            fonts = state.fonts.len(),
            families = state.families.len(),
            slots = state.slots.len(),
            "updatable fonts loaded"
        );
        self.state = state;
        self.last_modified_millis = persisted.last_modified_millis;
        self.config_version = 1;
    }

    /// Delete every entry of the updatable directory that is not an active
    /// slot: leftovers of interrupted batches and superseded slots.
    fn collect_orphans(&self, active: &[String]) {
        if let Err(e) = std::fs::create_dir_all(&self.files_dir) {
            warn!(error = %e, "cannot create updatable font directory");
            return;
        }
        let entries = match slot::list_entries(&self.files_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cannot list updatable font directory");
                return;
            }
        };
        for name in entries.iter().filter(|name| !active.contains(name)) {
            debug!(entry = %name, "removing orphan");
            slot::remove_entry_best_effort(&self.files_dir.join(name));
        }
    }

    /// Verify one slot.  Any unmarked or unparseable file, or a file stored
    /// under a name other than its canonical one, fails the whole slot.
    fn scan_slot(&self, slot: &Slot) -> Result<Vec<FontFileRecord>> {
        let mut records = Vec::new();
        for path in slot.files()? {
            if !self.marker.has_mark(&path) {
                return Err(FontLayerError::system(
                    SystemFontErrorKind::VerificationFailure,
                    format!("{} has no integrity mark", path.display()),
                ));
            }
            records.push(self.read_record(slot, &path)?);
        }
        Ok(records)
    }

    fn read_record(&self, slot: &Slot, path: &Path) -> Result<FontFileRecord> {
        let invalid = |message: String| FontLayerError::system(SystemFontErrorKind::InvalidFontFile, message);

        let postscript_name = self
            .parser
            .postscript_name(path)?
            .filter(|name| !name.is_empty())
            .ok_or_else(|| invalid(format!("{} has no PostScript name", path.display())))?;
        let canonical = self
            .parser
            .canonical_file_name(path)?
            .ok_or_else(|| invalid(format!("{} has no canonical name", path.display())))?;
        let stored = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        if canonical != stored {
            return Err(invalid(format!("{stored} should be named {canonical}")));
        }
        let revision = self.parser.revision(path)?;

        Ok(FontFileRecord {
            postscript_name,
            path: path.to_path_buf(),
            revision,
            verified: true,
            slot: slot.id().to_owned(),
        })
    }

    /// Add a verified file to `state` unless something at least as new is
    /// already active.  Losers are deleted from disk.
    fn admit(&self, state: &mut DirState, record: FontFileRecord, baseline: &FontConfig) {
        if let Some(floor) = self.baseline_revision(baseline, &record.postscript_name) {
            if record.revision < floor {
                info!(
                    postscript_name = %record.postscript_name,
                    revision = record.revision,
                    baseline = floor,
                    "baseline is newer, dropping update"
                );
                slot::remove_entry_best_effort(&record.path);
                return;
            }
        }

        match state.fonts.get(&record.postscript_name) {
            Some(existing) if existing.revision > record.revision => {
                debug!(postscript_name = %record.postscript_name, "newer revision already active");
                slot::remove_entry_best_effort(&record.path);
            }
            Some(existing) => {
                if existing.path != record.path {
                    slot::remove_entry_best_effort(&existing.path);
                }
                state.fonts.insert(record.postscript_name.clone(), record);
            }
            None => {
                state.fonts.insert(record.postscript_name.clone(), record);
            }
        }
    }
}
