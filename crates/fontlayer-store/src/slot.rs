// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage slots: one uniquely named subdirectory per accepted batch.

use std::path::{Path, PathBuf};

use fontlayer_core::error::Result;
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of every slot directory name.
pub const SLOT_PREFIX: &str = "~~";

/// Mode of slot directories: searchable by the font-rendering sandbox,
/// never listable.
#[cfg(unix)]
pub const SLOT_DIR_MODE: u32 = 0o711;

/// Mode of installed font files.
#[cfg(unix)]
pub const FONT_FILE_MODE: u32 = 0o644;

/// A slot directory under the updatable storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    id: String,
    path: PathBuf,
}

impl Slot {
    /// Create a fresh, empty slot under `files_dir`.
    pub fn create(files_dir: &Path) -> Result<Self> {
        let id = format!("{SLOT_PREFIX}{}", Uuid::new_v4().simple());
        let path = files_dir.join(&id);
        std::fs::create_dir(&path)?;
        set_mode(&path, DirOrFile::Dir)?;
        debug!(slot = %id, "slot created");
        Ok(Self { id, path })
    }

    /// Refer to an existing slot by id.
    pub fn open(files_dir: &Path, id: &str) -> Self {
        Self {
            id: id.to_owned(),
            path: files_dir.join(id),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files in the slot, sorted by name.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            files.push(entry?.path());
        }
        files.sort();
        Ok(files)
    }

    /// Delete the slot and everything in it.  Failures are logged; the next
    /// load collects whatever is left.
    pub fn remove_best_effort(&self) {
        remove_entry_best_effort(&self.path);
    }
}

/// Whether `name` looks like a slot id.
pub fn is_slot_name(name: &str) -> bool {
    name.len() > SLOT_PREFIX.len()
        && name.starts_with(SLOT_PREFIX)
        && !name.contains(['/', '\\'])
        && name != "~~."
        && name != "~~.."
}

/// Names of every entry directly under `files_dir`.
pub fn list_entries(files_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(files_dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Remove a file or directory tree, logging instead of failing.
pub fn remove_entry_best_effort(path: &Path) {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => debug!(path = %path.display(), "removed"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove, leaving for next load"),
    }
}

pub(crate) enum DirOrFile {
    Dir,
    File,
}

/// Apply the slot permission discipline to `path`.
#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, kind: DirOrFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match kind {
        DirOrFile::Dir => SLOT_DIR_MODE,
        DirOrFile::File => FONT_FILE_MODE,
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _kind: DirOrFile) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_names() {
        assert!(is_slot_name("~~4f1c"));
        assert!(!is_slot_name("~~"));
        assert!(!is_slot_name("fonts"));
        assert!(!is_slot_name("~~.."));
    }

    #[test]
    fn create_list_and_remove() {
        let root = tempfile::tempdir().expect("tempdir");
        let slot = Slot::create(root.path()).expect("create");
        assert!(is_slot_name(slot.id()));
        std::fs::write(slot.path().join("b.ttf"), b"b").expect("write");
        std::fs::write(slot.path().join("a.ttf"), b"a").expect("write");

        let files = slot.files().expect("files");
        assert_eq!(files, vec![slot.path().join("a.ttf"), slot.path().join("b.ttf")]);
        assert_eq!(list_entries(root.path()).expect("list"), vec![slot.id().to_owned()]);

        slot.remove_best_effort();
        assert!(list_entries(root.path()).expect("list").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn slot_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().expect("tempdir");
        let slot = Slot::create(root.path()).expect("create");
        let mode = std::fs::metadata(slot.path()).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o711);
    }

    #[test]
    fn removing_missing_entry_is_quiet() {
        let root = tempfile::tempdir().expect("tempdir");
        remove_entry_best_effort(&root.path().join("~~gone"));
    }
}
