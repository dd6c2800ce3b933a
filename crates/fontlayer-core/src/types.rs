// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the fontlayer font store.

use std::io::Read;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Font slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontSlant {
    #[default]
    Upright,
    Italic,
}

/// Weight and slant of a single font within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontStyle {
    /// CSS-style weight, 1..=1000 (400 = regular).
    pub weight: u16,
    pub slant: FontSlant,
}

impl FontStyle {
    pub const NORMAL: Self = Self {
        weight: 400,
        slant: FontSlant::Upright,
    };

    pub fn new(weight: u16, slant: FontSlant) -> Self {
        Self { weight, slant }
    }
}

impl Default for FontStyle {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// A font entry of the effective configuration, backed by a physical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Font {
    pub file: PathBuf,
    /// PostScript name of the face; the logical name used by the overlay.
    pub postscript_name: String,
    #[serde(default)]
    pub style: FontStyle,
    /// Face index inside a font collection (0 for single-face files).
    #[serde(default)]
    pub collection_index: u32,
    /// Variation settings string, e.g. `'wght' 700`.
    #[serde(default)]
    pub variation_settings: Option<String>,
}

/// Language variant of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FamilyVariant {
    #[default]
    Default,
    Compact,
    Elegant,
}

/// A named (or anonymous fallback) font family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFamily {
    /// `None` for fallback families.
    pub name: Option<String>,
    pub fonts: Vec<Font>,
    #[serde(default)]
    pub variant: FamilyVariant,
}

/// An alias family name pointing at another family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub original: String,
    pub weight: Option<u16>,
}

/// The effective, externally visible font configuration.
///
/// Family order matters: index 0 is the system default and stays stable,
/// while the *last* family with a given name wins name-based lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FontConfig {
    pub families: Vec<FontFamily>,
    #[serde(default)]
    pub aliases: Vec<Alias>,
    #[serde(default)]
    pub last_modified_millis: i64,
    #[serde(default)]
    pub config_version: i32,
}

impl FontConfig {
    /// First family with `name`, as seen by positional callers.
    pub fn first_family(&self, name: &str) -> Option<&FontFamily> {
        self.families
            .iter()
            .find(|family| family.name.as_deref() == Some(name))
    }

    /// Last family with `name`; the one used to resolve a lookup by name.
    pub fn last_family(&self, name: &str) -> Option<&FontFamily> {
        self.families
            .iter()
            .rev()
            .find(|family| family.name.as_deref() == Some(name))
    }

    /// Iterate over every font of every family, in family order.
    pub fn fonts(&self) -> impl Iterator<Item = &Font> {
        self.families.iter().flat_map(|family| family.fonts.iter())
    }
}

/// One installed, verified font file of the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFileRecord {
    pub postscript_name: String,
    /// Absolute path of the file inside its slot.
    pub path: PathBuf,
    pub revision: u64,
    /// Set once the integrity mark has been confirmed for `path`.
    pub verified: bool,
    /// Identifier of the storage slot holding the file.
    pub slot: String,
}

/// A font reference inside a family definition, by PostScript name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyFontRef {
    pub postscript_name: String,
    #[serde(default)]
    pub style: FontStyle,
    #[serde(default)]
    pub collection_index: u32,
    #[serde(default)]
    pub variation_settings: Option<String>,
}

impl FamilyFontRef {
    pub fn new(postscript_name: impl Into<String>) -> Self {
        Self {
            postscript_name: postscript_name.into(),
            style: FontStyle::NORMAL,
            collection_index: 0,
            variation_settings: None,
        }
    }
}

/// A family as submitted by an update request and as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDefinition {
    /// Required; `None` is a malformed request.
    pub name: Option<String>,
    pub fonts: Vec<FamilyFontRef>,
}

impl FamilyDefinition {
    pub fn new(name: impl Into<String>, fonts: Vec<FamilyFontRef>) -> Self {
        Self {
            name: Some(name.into()),
            fonts,
        }
    }
}

/// Where the bytes of a font to install come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl FontSource {
    /// Open the content for copying.
    pub fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        match self {
            Self::File(path) => Ok(Box::new(std::fs::File::open(path)?)),
            Self::Bytes(bytes) => Ok(Box::new(bytes.as_slice())),
        }
    }
}

/// A single request of an update batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontUpdateRequest {
    /// Install a font file, authenticated by `signature`.
    Install {
        source: FontSource,
        signature: Vec<u8>,
    },
    /// Add or redefine a named family over installed fonts.
    DefineFamily(FamilyDefinition),
}

impl FontUpdateRequest {
    pub fn install(source: FontSource, signature: impl Into<Vec<u8>>) -> Self {
        Self::Install {
            source,
            signature: signature.into(),
        }
    }

    pub fn define_family(definition: FamilyDefinition) -> Self {
        Self::DefineFamily(definition)
    }
}
