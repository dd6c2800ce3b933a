// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sfnt font metadata extractor backed by fontdb.

use std::path::Path;

use fontlayer_core::error::{FontLayerError, Result};
use fontlayer_core::traits::FontFileParser;
use tracing::debug;

const TAG_TRUETYPE: [u8; 4] = [0x00, 0x01, 0x00, 0x00];
const TAG_TRUE: [u8; 4] = *b"true";
const TAG_OPENTYPE: [u8; 4] = *b"OTTO";
const TAG_COLLECTION: [u8; 4] = *b"ttcf";

fn invalid_data(message: impl Into<String>) -> FontLayerError {
    FontLayerError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    ))
}

fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn sfnt_tag(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4)?.try_into().ok()
}

/// File extension for an sfnt version tag.
pub fn extension_for(data: &[u8]) -> Option<&'static str> {
    match sfnt_tag(data)? {
        TAG_TRUETYPE | TAG_TRUE => Some("ttf"),
        TAG_OPENTYPE => Some("otf"),
        TAG_COLLECTION => Some("ttc"),
        _ => None,
    }
}

/// Raw `head.fontRevision` of the font, or of the first font of a
/// collection.
pub fn head_revision(data: &[u8]) -> Option<u32> {
    let font = if sfnt_tag(data)? == TAG_COLLECTION {
        be_u32(data, 12)? as usize
    } else {
        0
    };
    let num_tables = be_u16(data, font.checked_add(4)?)? as usize;
    (0..num_tables).find_map(|i| {
        let record = font + 12 + 16 * i;
        if data.get(record..record + 4)? != b"head" {
            return None;
        }
        let table = be_u32(data, record + 8)? as usize;
        be_u32(data, table.checked_add(4)?)
    })
}

/// Extractor for TrueType, OpenType and collection files.
///
/// The PostScript name comes from the first face fontdb finds; the canonical
/// file name is `<PostScript name>.<ttf|otf|ttc>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SfntFontParser;

impl SfntFontParser {
    fn first_face_name(&self, data: Vec<u8>) -> Result<String> {
        let mut db = fontdb::Database::new();
        db.load_font_data(data);
        let face = db
            .faces()
            .next()
            .ok_or_else(|| invalid_data("no loadable face"))?;
        Ok(face.post_script_name.clone())
    }
}

impl FontFileParser for SfntFontParser {
    fn postscript_name(&self, path: &Path) -> Result<Option<String>> {
        let name = self.first_face_name(std::fs::read(path)?)?;
        debug!(path = %path.display(), %name, "parsed PostScript name");
        Ok(Some(name).filter(|name| !name.is_empty()))
    }

    fn canonical_file_name(&self, path: &Path) -> Result<Option<String>> {
        let data = std::fs::read(path)?;
        let Some(extension) = extension_for(&data) else {
            return Ok(None);
        };
        let name = self.first_face_name(data)?;
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("{name}.{extension}")))
    }

    fn revision(&self, path: &Path) -> Result<u64> {
        let data = std::fs::read(path)?;
        head_revision(&data)
            .map(u64::from)
            .ok_or_else(|| invalid_data(format!("{} has no head table", path.display())))
    }

    fn check_loadable(&self, path: &Path) -> Result<()> {
        self.first_face_name(std::fs::read(path)?).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A bare table directory with a single `head` table.
    fn sfnt(tag: [u8; 4], revision: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&tag);
        data.extend_from_slice(&1u16.to_be_bytes()); // numTables
        data.extend_from_slice(&[0; 6]);
        data.extend_from_slice(b"head");
        data.extend_from_slice(&0u32.to_be_bytes()); // checksum
        data.extend_from_slice(&28u32.to_be_bytes()); // offset
        data.extend_from_slice(&54u32.to_be_bytes()); // length
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // version
        data.extend_from_slice(&revision.to_be_bytes());
        data
    }

    #[test]
    fn extension_from_tag() {
        assert_eq!(extension_for(&sfnt(TAG_TRUETYPE, 1)), Some("ttf"));
        assert_eq!(extension_for(&sfnt(TAG_OPENTYPE, 1)), Some("otf"));
        assert_eq!(extension_for(b"ttcf...."), Some("ttc"));
        assert_eq!(extension_for(b"wOFF"), None);
        assert_eq!(extension_for(b"ab"), None);
    }

    #[test]
    fn revision_from_head_table() {
        assert_eq!(head_revision(&sfnt(TAG_TRUETYPE, 0x0002_8000)), Some(0x0002_8000));
        assert_eq!(head_revision(&sfnt(TAG_TRUETYPE, 1)[..20]), None);
    }

    #[test]
    fn revision_of_first_font_in_collection() {
        let font = sfnt(TAG_TRUETYPE, 7);
        let mut data = Vec::new();
        data.extend_from_slice(&TAG_COLLECTION);
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes()); // numFonts
        data.extend_from_slice(&16u32.to_be_bytes()); // offset of font 0
        // Table offsets inside a collection are relative to the file start.
        let mut shifted = font.clone();
        shifted[20..24].copy_from_slice(&(28u32 + 16).to_be_bytes());
        data.extend_from_slice(&shifted);
        assert_eq!(head_revision(&data), Some(7));
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.ttf");
        std::fs::write(&path, b"definitely not a font").expect("write");

        let parser = SfntFontParser;
        assert!(parser.check_loadable(&path).is_err());
        assert!(parser.postscript_name(&path).is_err());
        assert!(parser.revision(&path).is_err());
        assert_eq!(parser.canonical_file_name(&path).expect("no tag"), None);
    }
}
