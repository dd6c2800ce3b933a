// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Atomic update executor.
//
// A batch is staged into one fresh slot and validated against a working copy
// of the directory state.  Only once the persisted config has been written is
// the working copy swapped in; any failure before that deletes the slot and
// leaves the live state untouched.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use fontlayer_core::error::{FontLayerError, Result, SystemFontErrorKind};
use fontlayer_core::types::{
    FamilyDefinition, FontConfig, FontFileRecord, FontSource, FontUpdateRequest,
};
use tracing::{debug, info, instrument, warn};

use crate::dir::{DirState, UpdatableFontDir};
use crate::persistent::{self, PersistentConfig};
use crate::slot::{self, DirOrFile, Slot};

impl UpdatableFontDir {
    /// Apply a batch of requests with all-or-nothing semantics.
    ///
    /// Installs are processed first, in order, then family definitions.  On
    /// success the new state is visible, the last-modified time is the
    /// clock's and the config version is bumped.
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub fn update(&mut self, requests: &[FontUpdateRequest]) -> Result<()> {
        let has_install = requests
            .iter()
            .any(|request| matches!(request, FontUpdateRequest::Install { .. }));
        let slot = if has_install {
            Some(Slot::create(&self.files_dir).map_err(|e| {
                FontLayerError::system(
                    SystemFontErrorKind::FailedToWriteFontFile,
                    format!("failed to create slot: {e}"),
                )
            })?)
        } else {
            None
        };

        let mut working = self.state.clone();
        let now = self.clock.now_millis();
        let committed = self
            .stage(requests, slot.as_ref(), &mut working)
            .and_then(|()| self.persist(&mut working, slot.as_ref(), now));

        if let Err(e) = committed {
            warn!(error = %e, "update batch rejected, rolling back");
            if let Some(slot) = &slot {
                slot.remove_best_effort();
            }
            return Err(e);
        }

        self.state = working;
        self.last_modified_millis = now;
        self.config_version += 1;
        info!(
            fonts = self.state.fonts.len(),
            families = self.state.families.len(),
            config_version = self.config_version,
            "update batch committed"
        );
        Ok(())
    }

    fn stage(
        &self,
        requests: &[FontUpdateRequest],
        slot: Option<&Slot>,
        working: &mut DirState,
    ) -> Result<()> {
        let baseline = self.baseline();

        for (index, request) in requests.iter().enumerate() {
            if let FontUpdateRequest::Install { source, signature } = request {
                let Some(slot) = slot else {
                    return Err(FontLayerError::system(
                        SystemFontErrorKind::FailedToWriteFontFile,
                        "no slot to stage into",
                    ));
                };
                self.install_font_file(slot, index, source, signature, &baseline, working)?;
            }
        }

        for request in requests {
            if let FontUpdateRequest::DefineFamily(definition) = request {
                validate_family(definition, working)?;
                working.define_family(definition.clone());
            }
        }
        Ok(())
    }

    #[instrument(skip(self, slot, source, signature, baseline, working), fields(slot = %slot.id()))]
    fn install_font_file(
        &self,
        slot: &Slot,
        index: usize,
        source: &FontSource,
        signature: &[u8],
        baseline: &FontConfig,
        working: &mut DirState,
    ) -> Result<()> {
        use SystemFontErrorKind::*;

        let staged = slot.path().join(format!(".staging-{index}"));
        copy_into(source, &staged).map_err(|e| {
            FontLayerError::system(FailedToWriteFontFile, format!("failed to copy font file: {e}"))
        })?;

        self.marker.set_up(&staged, signature).map_err(|e| {
            FontLayerError::system(VerificationFailure, format!("failed to set up integrity mark: {e}"))
        })?;

        let postscript_name = match self.parser.postscript_name(&staged) {
            Ok(Some(name)) if !name.is_empty() => name,
            Ok(_) => {
                return Err(FontLayerError::system(
                    InvalidFontName,
                    "font has no PostScript name",
                ));
            }
            Err(e) => {
                return Err(FontLayerError::system(
                    InvalidFontFile,
                    format!("failed to read PostScript name: {e}"),
                ));
            }
        };

        self.parser.check_loadable(&staged).map_err(|e| {
            FontLayerError::system(InvalidFontFile, format!("{postscript_name} cannot be loaded: {e}"))
        })?;

        let file_name = match self.parser.canonical_file_name(&staged) {
            Ok(Some(name)) if is_plain_file_name(&name) => name,
            Ok(_) => {
                return Err(FontLayerError::system(
                    InvalidFontFile,
                    format!("{postscript_name} has no usable file name"),
                ));
            }
            Err(e) => {
                return Err(FontLayerError::system(
                    InvalidFontFile,
                    format!("failed to derive file name of {postscript_name}: {e}"),
                ));
            }
        };

        let revision = self.parser.revision(&staged).map_err(|e| {
            FontLayerError::system(InvalidFontFile, format!("failed to read revision of {postscript_name}: {e}"))
        })?;

        let active = working
            .fonts
            .get(&postscript_name)
            .map(|record| record.revision)
            .or_else(|| self.baseline_revision(baseline, &postscript_name));
        if let Some(active) = active {
            if revision < active {
                return Err(FontLayerError::system(
                    Downgrading,
                    format!("{postscript_name} revision {revision} is older than {active}"),
                ));
            }
        }

        let path = slot.path().join(&file_name);
        self.marker.rename(&staged, &path).map_err(|e| {
            FontLayerError::system(
                FailedToWriteFontFile,
                format!("failed to rename {} to {file_name}: {e}", staged.display()),
            )
        })?;
        slot::set_mode(&path, DirOrFile::File).map_err(|e| {
            FontLayerError::system(FailedToWriteFontFile, format!("failed to set mode of {file_name}: {e}"))
        })?;

        debug!(%postscript_name, revision, "font staged");
        working.fonts.insert(
            postscript_name.clone(),
            FontFileRecord {
                postscript_name,
                path,
                revision,
                verified: true,
                slot: slot.id().to_owned(),
            },
        );
        Ok(())
    }

    fn persist(&self, working: &mut DirState, slot: Option<&Slot>, now: i64) -> Result<()> {
        if let Some(slot) = slot {
            working.slots.push(slot.id().to_owned());
        }
        working.slots = working.live_slots();

        let config = PersistentConfig {
            last_modified_millis: now,
            updated_font_dirs: working.slots.clone(),
            font_families: working.families.clone(),
        };
        persistent::write(&self.config_path, &config).map_err(|e| {
            FontLayerError::system(
                SystemFontErrorKind::FailedUpdateConfig,
                format!("failed to write config: {e}"),
            )
        })
    }
}

fn validate_family(definition: &FamilyDefinition, working: &DirState) -> Result<()> {
    let name = match definition.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(FontLayerError::InvalidArgument(
                "font family definition has no name".into(),
            ));
        }
    };
    for font in &definition.fonts {
        if !working.fonts.contains_key(&font.postscript_name) {
            return Err(FontLayerError::system(
                SystemFontErrorKind::FontNotFound,
                format!("family {name} references {} which is not installed", font.postscript_name),
            ));
        }
    }
    Ok(())
}

fn copy_into(source: &FontSource, dest: &Path) -> Result<()> {
    let mut reader = source.open()?;
    let mut file = File::create(dest)?;
    std::io::copy(&mut reader, &mut file)?;
    file.flush()?;
    file.sync_all()?;
    slot::set_mode(dest, DirOrFile::File)
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.starts_with('.') && !name.contains(['/', '\\'])
}
