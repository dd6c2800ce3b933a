// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font config merger: baseline families overlaid with updated fonts and
// update-defined families.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fontlayer_core::error::Result;
use fontlayer_core::traits::ConfigSource;
use fontlayer_core::types::{FontConfig, FontFamily};
use tracing::{debug, instrument};

/// Point every baseline font whose PostScript name is in `overlay` at the
/// overlay file.
pub fn overlay_fonts(mut baseline: FontConfig, overlay: &BTreeMap<String, PathBuf>) -> FontConfig {
    for family in &mut baseline.families {
        for font in &mut family.fonts {
            if let Some(path) = overlay.get(&font.postscript_name) {
                font.file = path.clone();
            }
        }
    }
    baseline
}

/// Append update-defined families after the baseline families.
///
/// Index 0 keeps pointing at the original default family; a name lookup
/// through [`FontConfig::last_family`] sees the appended definition.
pub fn merge(
    mut config: FontConfig,
    families: impl IntoIterator<Item = FontFamily>,
    last_modified_millis: i64,
    config_version: i32,
) -> FontConfig {
    config.families.extend(families);
    config.last_modified_millis = last_modified_millis;
    config.config_version = config_version;
    config
}

/// A fixed baseline catalogue acting as the config-fetch callback.
#[derive(Debug, Clone, Default)]
pub struct StaticBaseline {
    config: FontConfig,
}

impl StaticBaseline {
    pub fn new(config: FontConfig) -> Self {
        Self { config }
    }

    /// Load the baseline catalogue from a JSON file.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let config: FontConfig = serde_json::from_slice(&data)?;
        debug!(families = config.families.len(), "baseline catalogue loaded");
        Ok(Self { config })
    }

    pub fn config(&self) -> &FontConfig {
        &self.config
    }
}

impl ConfigSource for StaticBaseline {
    fn fetch(&self, overlay: &BTreeMap<String, PathBuf>) -> FontConfig {
        overlay_fonts(self.config.clone(), overlay)
    }
}
