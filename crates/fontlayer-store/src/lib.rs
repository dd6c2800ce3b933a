// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fontlayer-store: the transactional updatable font directory.  Fonts are
// staged into per-batch slots, verified, and merged over the read-only
// baseline catalogue.

pub mod admission;
pub mod dir;
mod loader;
pub mod merge;
pub mod parser;
pub mod persistent;
pub mod slot;
mod update;

#[cfg(test)]
mod test_support;

pub use admission::{AdmissionError, AdmissionGuard};
pub use dir::{DirState, UpdatableFontDir};
pub use merge::StaticBaseline;
pub use parser::SfntFontParser;
pub use persistent::PersistentConfig;
