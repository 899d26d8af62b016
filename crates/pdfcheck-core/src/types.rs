// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for pdfcheck.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message returned when a document passes the format check untouched.
pub const MSG_VALID: &str = "PDF valido.";

/// Message returned when a document was repaired and replaced.
pub const MSG_NORMALIZED: &str = "PDF normalizado exitosamente.";

/// Prefix for messages describing a failed repair.
pub const MSG_NORMALIZE_FAILED: &str = "PDF no se pudo normalizar. Detalles: ";

/// Prefix for failures outside the repair pipeline (unreadable file, staging).
pub const MSG_UNEXPECTED: &str = "Error inesperado al procesar PDF: ";

/// Unique identifier for one verification call (used in logs and temp names).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encoded format of an extracted image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Baseline JPEG (`DCTDecode`), written as stored.
    Jpeg,
    /// JPEG 2000 (`JPXDecode`), written as stored.
    Jpeg2000,
    /// Raw samples re-encoded as PNG.
    Png,
}

impl ImageFormat {
    /// File extension used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Jpeg2000 => "jp2",
            Self::Png => "png",
        }
    }
}

/// Result of verifying one document. Returned to every caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub message: String,
    /// Images extracted during a repair, in page-then-xref order.
    pub images: Vec<PathBuf>,
    /// Whether the file at the verified path was replaced.
    #[serde(skip)]
    pub replaced: bool,
}

impl VerificationResult {
    /// Document was already usable; nothing was changed.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: MSG_VALID.into(),
            images: Vec::new(),
            replaced: false,
        }
    }

    /// Document was rebuilt from its images and replaced in place.
    pub fn normalized(images: Vec<PathBuf>) -> Self {
        Self {
            is_valid: true,
            message: MSG_NORMALIZED.into(),
            images,
            replaced: true,
        }
    }

    /// Document is unusable and was left untouched.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            images: Vec::new(),
            replaced: false,
        }
    }
}

/// One file's outcome inside a directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// File name relative to the scanned directory.
    pub file: String,
    pub message: String,
    pub images: Vec<PathBuf>,
}

/// Partitioned results of scanning a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub directory: String,
    pub valid_files: Vec<ResultEntry>,
    pub invalid_files: Vec<ResultEntry>,
}

impl ScanReport {
    /// Total number of files classified.
    pub fn total(&self) -> usize {
        self.valid_files.len() + self.invalid_files.len()
    }
}
