// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for fontlayer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of operational failures an update batch can report.
///
/// Each kind carries a stable numeric code so that callers on the other side
/// of an IPC boundary can report the outcome without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemFontErrorKind {
    /// Staging rename to the canonical file name could not complete.
    FailedToWriteFontFile,
    /// The signature did not establish integrity protection.
    VerificationFailure,
    /// Metadata extraction failed or the file is otherwise unusable.
    InvalidFontFile,
    /// The extracted PostScript name is missing or empty.
    InvalidFontName,
    /// The candidate revision is strictly lower than the active one.
    Downgrading,
    /// Persisting the config store failed after staging succeeded.
    FailedUpdateConfig,
    /// A family definition references a font with no backing file.
    FontNotFound,
}

impl SystemFontErrorKind {
    /// Stable external result code.
    pub fn code(&self) -> i32 {
        match self {
            Self::FailedToWriteFontFile => -1,
            Self::VerificationFailure => -2,
            Self::InvalidFontFile => -4,
            Self::InvalidFontName => -5,
            Self::Downgrading => -6,
            Self::FailedUpdateConfig => -7,
            Self::FontNotFound => -9,
        }
    }

    /// Short keyword used in logs and audit entries.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::FailedToWriteFontFile => "failed-to-write-font-file",
            Self::VerificationFailure => "verification-failure",
            Self::InvalidFontFile => "invalid-font-file",
            Self::InvalidFontName => "invalid-font-name",
            Self::Downgrading => "downgrading",
            Self::FailedUpdateConfig => "failed-update-config",
            Self::FontNotFound => "font-not-found",
        }
    }
}

impl std::fmt::Display for SystemFontErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Top-level error type for all fontlayer operations.
#[derive(Debug, Error)]
pub enum FontLayerError {
    // -- Update batch failures --
    #[error("system font update failed ({kind}): {message}")]
    SystemFont {
        kind: SystemFontErrorKind,
        message: String,
    },

    /// The request itself is malformed (caller-contract violation).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Security errors --
    #[error("signature error: {0}")]
    Signature(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FontLayerError {
    /// Build a typed update failure.
    pub fn system(kind: SystemFontErrorKind, message: impl Into<String>) -> Self {
        Self::SystemFont {
            kind,
            message: message.into(),
        }
    }

    /// The typed failure kind, if this is an operational update failure.
    pub fn kind(&self) -> Option<SystemFontErrorKind> {
        match self {
            Self::SystemFont { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FontLayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(SystemFontErrorKind::FailedToWriteFontFile.code(), -1);
        assert_eq!(SystemFontErrorKind::VerificationFailure.code(), -2);
        assert_eq!(SystemFontErrorKind::Downgrading.code(), -6);
        assert_eq!(SystemFontErrorKind::FontNotFound.code(), -9);
    }

    #[test]
    fn kind_only_for_system_font_errors() {
        let err = FontLayerError::system(SystemFontErrorKind::Downgrading, "rev 1 < rev 2");
        assert_eq!(err.kind(), Some(SystemFontErrorKind::Downgrading));
        assert!(err.to_string().contains("downgrading"));

        let err = FontLayerError::InvalidArgument("family name missing".into());
        assert_eq!(err.kind(), None);
    }
}
