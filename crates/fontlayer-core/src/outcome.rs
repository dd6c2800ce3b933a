// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outcome reporting for update callers.
//
// Every update result is reduced to a stable numeric code plus a plain
// English message, so the layer that relays results to clients never needs
// to inspect error internals.

use crate::error::{FontLayerError, SystemFontErrorKind};

/// Result code for a successful update.
pub const RESULT_SUCCESS: i32 = 0;

/// Result code for failures outside the typed update set
/// (malformed requests, storage problems).
pub const RESULT_ERROR_UNKNOWN: i32 = -1000;

/// A human-readable description of an update outcome.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub code: i32,
    pub message: String,
    pub retriable: bool,
}

/// Stable result code for an update result.
pub fn result_code<T>(result: &Result<T, FontLayerError>) -> i32 {
    match result {
        Ok(_) => RESULT_SUCCESS,
        Err(err) => err.kind().map_or(RESULT_ERROR_UNKNOWN, |kind| kind.code()),
    }
}

/// Describe a failure for logs and command-line output.
pub fn describe(err: &FontLayerError) -> Outcome {
    match err {
        FontLayerError::SystemFont { kind, message } => describe_kind(*kind, message),

        FontLayerError::InvalidArgument(detail) => Outcome {
            code: RESULT_ERROR_UNKNOWN,
            message: format!("The update request is malformed: {detail}."),
            retriable: false,
        },

        FontLayerError::Signature(_) => Outcome {
            code: RESULT_ERROR_UNKNOWN,
            message: "A signature or integrity check failed.".into(),
            retriable: false,
        },

        FontLayerError::Database(_) | FontLayerError::Io(_) | FontLayerError::Serialization(_) => {
            Outcome {
                code: RESULT_ERROR_UNKNOWN,
                message: format!("Font storage had a problem ({err})."),
                retriable: true,
            }
        }
    }
}

fn describe_kind(kind: SystemFontErrorKind, detail: &str) -> Outcome {
    use SystemFontErrorKind::*;

    let (message, retriable) = match kind {
        VerificationFailure => ("The font signature could not be verified.", false),
        InvalidFontFile => ("The file is not a usable font.", false),
        InvalidFontName => ("The font does not declare a PostScript name.", false),
        FailedToWriteFontFile => ("The font could not be written to storage.", true),
        Downgrading => ("A newer revision of this font is already active.", false),
        FontNotFound => ("The family refers to a font that is not installed.", false),
        FailedUpdateConfig => ("The font configuration could not be saved.", true),
    };
    Outcome {
        code: kind.code(),
        message: format!("{message} ({detail})"),
        retriable,
    }
}
