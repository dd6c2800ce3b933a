// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory doubles for the store's collaborators.
//
// A fake font file is a line of text `<canonical name>,<revision>,<psname>`,
// e.g. `foo.ttf,1,foo`.  Marks live in a shared set; only the signature
// `Good signature` establishes one.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fontlayer_core::error::{FontLayerError, Result};
use fontlayer_core::traits::{FontFileParser, IntegrityMarker};
use fontlayer_core::types::{
    FamilyDefinition, FamilyFontRef, FamilyVariant, Font, FontConfig, FontFamily, FontSource,
    FontStyle, FontUpdateRequest,
};
use tempfile::TempDir;

use crate::dir::UpdatableFontDir;
use crate::merge::overlay_fonts;

pub const GOOD_SIGNATURE: &[u8] = b"Good signature";
pub const NOW_MILLIS: i64 = 1_234_567_890;

fn parse(path: &Path) -> Result<(String, u64, String)> {
    let content = std::fs::read_to_string(path)?;
    let mut parts = content.trim().split(',');
    let (Some(file_name), Some(revision), Some(name), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(FontLayerError::InvalidArgument(format!("not a font: {content:?}")));
    };
    let revision = revision
        .parse()
        .map_err(|_| FontLayerError::InvalidArgument(format!("bad revision: {revision:?}")))?;
    Ok((file_name.to_owned(), revision, name.to_owned()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeParser;

impl FontFileParser for FakeParser {
    fn postscript_name(&self, path: &Path) -> Result<Option<String>> {
        let (_, _, name) = parse(path)?;
        Ok(Some(name))
    }

    fn canonical_file_name(&self, path: &Path) -> Result<Option<String>> {
        let (file_name, _, _) = parse(path)?;
        Ok(Some(file_name))
    }

    fn revision(&self, path: &Path) -> Result<u64> {
        let (_, revision, _) = parse(path)?;
        Ok(revision)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeMarker {
    marked: Rc<RefCell<HashSet<PathBuf>>>,
    fail_rename: Rc<Cell<bool>>,
}

impl FakeMarker {
    pub fn remove_mark(&self, path: &Path) {
        self.marked.borrow_mut().remove(path);
    }

    pub fn fail_renames(&self, fail: bool) {
        self.fail_rename.set(fail);
    }
}

impl IntegrityMarker for FakeMarker {
    fn set_up(&self, path: &Path, signature: &[u8]) -> Result<()> {
        if signature != GOOD_SIGNATURE {
            return Err(FontLayerError::Signature("signature rejected".into()));
        }
        self.marked.borrow_mut().insert(path.to_path_buf());
        Ok(())
    }

    fn has_mark(&self, path: &Path) -> bool {
        self.marked.borrow().contains(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if self.fail_rename.get() {
            return Err(FontLayerError::Io(std::io::Error::other("rename refused")));
        }
        std::fs::rename(from, to)?;
        let mut marked = self.marked.borrow_mut();
        if marked.remove(from) {
            marked.insert(to.to_path_buf());
        }
        Ok(())
    }
}

/// A scratch data directory with a preinstalled font directory, shared
/// fakes, and a baseline catalogue of one `sans-serif` family.
pub struct TestEnv {
    pub root: TempDir,
    pub files_dir: PathBuf,
    pub config_path: PathBuf,
    pub preinstalled_dir: PathBuf,
    pub marker: FakeMarker,
    baseline_fonts: Rc<RefCell<Vec<Font>>>,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let files_dir = root.path().join("updatable_fonts");
        let preinstalled_dir = root.path().join("preinstalled");
        std::fs::create_dir(&files_dir).expect("files dir");
        std::fs::create_dir(&preinstalled_dir).expect("preinstalled dir");
        Self {
            config_path: root.path().join("config.json"),
            files_dir,
            preinstalled_dir,
            root,
            marker: FakeMarker::default(),
            baseline_fonts: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Write a preinstalled font and add it to the baseline family.
    pub fn preinstall(&self, content: &str) {
        let file_name = content.split(',').next().expect("file name");
        let name = content.rsplit(',').next().expect("name");
        let path = self.preinstalled_dir.join(file_name);
        std::fs::write(&path, content).expect("write preinstalled");
        let mut fonts = self.baseline_fonts.borrow_mut();
        if !fonts.iter().any(|font| font.postscript_name == name) {
            fonts.push(Font {
                file: path,
                postscript_name: name.to_owned(),
                style: FontStyle::NORMAL,
                collection_index: 0,
                variation_settings: None,
            });
        }
    }

    /// A directory instance over this environment, not yet loaded.
    pub fn dir(&self) -> UpdatableFontDir {
        self.dir_with_config_path(self.config_path.clone())
    }

    pub fn dir_with_config_path(&self, config_path: PathBuf) -> UpdatableFontDir {
        let fonts = Rc::clone(&self.baseline_fonts);
        let source = move |overlay: &BTreeMap<String, PathBuf>| {
            let baseline = FontConfig {
                families: vec![FontFamily {
                    name: Some("sans-serif".into()),
                    fonts: fonts.borrow().clone(),
                    variant: FamilyVariant::Default,
                }],
                ..FontConfig::default()
            };
            overlay_fonts(baseline, overlay)
        };
        UpdatableFontDir::new(
            self.files_dir.clone(),
            config_path,
            FakeParser,
            self.marker.clone(),
            source,
            || NOW_MILLIS,
        )
    }

    /// A freshly loaded directory instance, as after a restart.
    pub fn load(&self) -> UpdatableFontDir {
        let mut dir = self.dir();
        dir.load_font_file_map();
        dir
    }

    /// Entries directly under the updatable directory.
    pub fn slot_entries(&self) -> Vec<PathBuf> {
        let mut entries: Vec<_> = std::fs::read_dir(&self.files_dir)
            .expect("list")
            .map(|entry| entry.expect("entry").path())
            .collect();
        entries.sort();
        entries
    }
}

pub fn install(content: &str) -> FontUpdateRequest {
    FontUpdateRequest::install(FontSource::Bytes(content.as_bytes().to_vec()), GOOD_SIGNATURE)
}

pub fn install_with_signature(content: &str, signature: &[u8]) -> FontUpdateRequest {
    FontUpdateRequest::install(FontSource::Bytes(content.as_bytes().to_vec()), signature)
}

pub fn family(name: &str, fonts: &[&str]) -> FontUpdateRequest {
    FontUpdateRequest::define_family(FamilyDefinition::new(
        name,
        fonts.iter().map(|font| FamilyFontRef::new(*font)).collect(),
    ))
}

/// Revision the fake parser reads from the record's file on disk.
pub fn revision_on_disk(path: &Path) -> u64 {
    FakeParser.revision(path).expect("revision")
}
