// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fontlayer: Core types, capability traits and error definitions shared
// across all crates.

pub mod config;
pub mod error;
pub mod outcome;
pub mod traits;
pub mod types;

pub use config::FontLayerSettings;
pub use error::{FontLayerError, Result, SystemFontErrorKind};
pub use traits::{Clock, ConfigSource, FontFileParser, IntegrityMarker, SystemClock};
pub use types::*;
