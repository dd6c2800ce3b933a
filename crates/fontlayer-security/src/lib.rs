// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fontlayer-security: signature verification and integrity marks for
// updatable fonts, plus the audit trail of update batches.

pub mod audit;
pub mod integrity;
pub mod marks;
pub mod signing;

pub use audit::{AuditEntry, AuditLog};
pub use integrity::{hash_bytes, hash_file};
pub use marks::MarkRegistry;
pub use signing::{SigningKeyPair, verify_signature};
