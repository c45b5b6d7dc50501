// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Platen.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Platen operations.
///
/// Lookups that are *expected* to miss (finding a printer, reading a
/// setting) return `Option` instead of `Err(NotFound)`, so a caller can
/// always tell "no such printer" apart from "printer existed but the
/// command failed".
#[derive(Debug, Error)]
pub enum Error {
    /// A named resource (default printer, config directory, pickled
    /// printer) could not be located.
    #[error("not found: {0}")]
    NotFound(String),

    /// A backend could not be reached or refused the call.
    #[error("backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// A null or malformed identifier was passed; nothing was mutated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Settings, default-printers, or pickle file I/O failed.
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A flat on-disk record was truncated or corrupt.
    #[error("malformed record in {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Configuration (de)serialization failed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a backend failure with context.
    pub fn backend(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;
