// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The updatable font directory: in-memory state over the on-disk slots.
//
// Loading lives in `loader.rs`, batch updates in `update.rs`; this module
// holds the state itself and the read-side queries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fontlayer_core::traits::{Clock, ConfigSource, FontFileParser, IntegrityMarker};
use fontlayer_core::types::{
    FamilyDefinition, FamilyVariant, Font, FontConfig, FontFamily, FontFileRecord,
};
use tracing::debug;

use crate::merge;

/// Overlay state: one record per PostScript name, the update-defined
/// families, and the active slots in commit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirState {
    pub fonts: BTreeMap<String, FontFileRecord>,
    /// Named definitions whose references all resolve; oldest first.
    pub families: Vec<FamilyDefinition>,
    pub slots: Vec<String>,
}

impl DirState {
    pub fn postscript_map(&self) -> BTreeMap<String, PathBuf> {
        self.fonts
            .iter()
            .map(|(name, record)| (name.clone(), record.path.clone()))
            .collect()
    }

    /// Resolve a definition into a family of overlay files, `None` if it is
    /// unnamed or references a font the overlay does not hold.
    pub fn resolve(&self, definition: &FamilyDefinition) -> Option<FontFamily> {
        let name = definition.name.as_deref().filter(|name| !name.is_empty())?;
        let fonts = definition
            .fonts
            .iter()
            .map(|font| {
                let record = self.fonts.get(&font.postscript_name)?;
                Some(Font {
                    file: record.path.clone(),
                    postscript_name: font.postscript_name.clone(),
                    style: font.style,
                    collection_index: font.collection_index,
                    variation_settings: font.variation_settings.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(FontFamily {
            name: Some(name.to_owned()),
            fonts,
            variant: FamilyVariant::Default,
        })
    }

    /// Add `definition`, replacing an older one of the same name.  The new
    /// definition always moves to the end.
    pub fn define_family(&mut self, definition: FamilyDefinition) {
        self.families.retain(|existing| existing.name != definition.name);
        self.families.push(definition);
    }

    /// Active slots that still hold at least one record, in commit order.
    pub fn live_slots(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|slot| self.fonts.values().any(|record| &record.slot == *slot))
            .cloned()
            .collect()
    }
}

/// Transactional store of updatable fonts over the immutable baseline.
///
/// Call [`UpdatableFontDir::load_font_file_map`] once after construction to
/// rebuild state from disk, then apply batches with
/// [`UpdatableFontDir::update`].
pub struct UpdatableFontDir {
    pub(crate) files_dir: PathBuf,
    pub(crate) config_path: PathBuf,
    pub(crate) parser: Box<dyn FontFileParser>,
    pub(crate) marker: Box<dyn IntegrityMarker>,
    pub(crate) config_source: Box<dyn ConfigSource>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) state: DirState,
    pub(crate) last_modified_millis: i64,
    pub(crate) config_version: i32,
}

impl std::fmt::Debug for UpdatableFontDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatableFontDir")
            .field("files_dir", &self.files_dir)
            .field("config_path", &self.config_path)
            .field("state", &self.state)
            .field("last_modified_millis", &self.last_modified_millis)
            .field("config_version", &self.config_version)
            .finish_non_exhaustive()
    }
}

impl UpdatableFontDir {
    pub fn new(
        files_dir: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
        parser: impl FontFileParser + 'static,
        marker: impl IntegrityMarker + 'static,
        config_source: impl ConfigSource + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            files_dir: files_dir.into(),
            config_path: config_path.into(),
            parser: Box::new(parser),
            marker: Box::new(marker),
            config_source: Box::new(config_source),
            clock: Box::new(clock),
            state: DirState::default(),
            last_modified_millis: 0,
            config_version: 0,
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Installed overlay fonts, keyed by PostScript name.
    pub fn records(&self) -> &BTreeMap<String, FontFileRecord> {
        &self.state.fonts
    }

    /// PostScript name → overlay file path.
    pub fn postscript_map(&self) -> BTreeMap<String, PathBuf> {
        self.state.postscript_map()
    }

    /// Family name → the most recent update-defined family of that name.
    pub fn font_family_map(&self) -> BTreeMap<String, FontFamily> {
        let mut map = BTreeMap::new();
        for definition in &self.state.families {
            if let Some(family) = self.state.resolve(definition) {
                if let Some(name) = family.name.clone() {
                    map.insert(name, family);
                }
            }
        }
        map
    }

    /// Active slot ids in commit order.
    pub fn active_slots(&self) -> &[String] {
        &self.state.slots
    }

    pub fn last_modified_millis(&self) -> i64 {
        self.last_modified_millis
    }

    /// 1 after a load, incremented by every successful update.
    pub fn config_version(&self) -> i32 {
        self.config_version
    }

    /// The effective configuration: the baseline with overlay files swapped
    /// in, followed by the update-defined families.
    pub fn system_font_config(&self) -> FontConfig {
        let config = self.config_source.fetch(&self.state.postscript_map());
        let families = self
            .state
            .families
            .iter()
            .filter_map(|definition| self.state.resolve(definition));
        merge::merge(config, families, self.last_modified_millis, self.config_version)
    }

    /// The pure baseline catalogue.
    pub(crate) fn baseline(&self) -> FontConfig {
        self.config_source.fetch(&BTreeMap::new())
    }

    /// Revision of the baseline font declaring `postscript_name`, first
    /// occurrence in family order.  A file that cannot be parsed imposes no
    /// floor.
    pub(crate) fn baseline_revision(&self, baseline: &FontConfig, postscript_name: &str) -> Option<u64> {
        let font = baseline
            .fonts()
            .find(|font| font.postscript_name == postscript_name)?;
        match self.parser.revision(&font.file) {
            Ok(revision) => Some(revision),
            Err(e) => {
                debug!(postscript_name, file = %font.file.display(), error = %e, "baseline revision unavailable");
                None
            }
        }
    }
}
