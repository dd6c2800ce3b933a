// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits for the collaborators the font store calls into.
//
// The store never talks to fs-verity, a font parser, the baseline catalogue
// or the wall clock directly; each is injected as one of these traits so that
// tests can substitute in-memory doubles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::FontConfig;

/// Durable per-file integrity protection (fs-verity or an equivalent).
pub trait IntegrityMarker {
    /// Mark `path` as integrity-protected, authenticated by `signature`.
    /// Fails if the signature does not establish protection.
    fn set_up(&self, path: &Path, signature: &[u8]) -> Result<()>;

    /// Whether `path` currently carries a valid integrity mark.
    fn has_mark(&self, path: &Path) -> bool;

    /// Rename a protected file, keeping its protection state.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

impl<T: IntegrityMarker + ?Sized> IntegrityMarker for std::rc::Rc<T> {
    fn set_up(&self, path: &Path, signature: &[u8]) -> Result<()> {
        (**self).set_up(path, signature)
    }

    fn has_mark(&self, path: &Path) -> bool {
        (**self).has_mark(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        (**self).rename(from, to)
    }
}

/// Extracts the identity of a font file.
pub trait FontFileParser {
    /// PostScript name of the font, `None` if the file has none.
    fn postscript_name(&self, path: &Path) -> Result<Option<String>>;

    /// Canonical file name the font must be stored under.
    fn canonical_file_name(&self, path: &Path) -> Result<Option<String>>;

    /// Numeric font revision.
    fn revision(&self, path: &Path) -> Result<u64>;

    /// Check the file can actually be loaded as a font.
    fn check_loadable(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Produces the baseline configuration with an overlay applied.
///
/// Called with an empty map it must return the pure baseline.
pub trait ConfigSource {
    fn fetch(&self, overlay: &BTreeMap<String, PathBuf>) -> FontConfig;
}

impl<F> ConfigSource for F
where
    F: Fn(&BTreeMap<String, PathBuf>) -> FontConfig,
{
    fn fetch(&self, overlay: &BTreeMap<String, PathBuf>) -> FontConfig {
        self(overlay)
    }
}

/// Source of the timestamp written into the persisted config.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

impl<F> Clock for F
where
    F: Fn() -> i64,
{
    fn now_millis(&self) -> i64 {
        self()
    }
}

/// Wall clock, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
