// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfcheck-document — Document handling for the pdfcheck verifier.
//
// Provides strict and lenient PDF opening, page copying, the format validity
// check, embedded-image extraction (with raw-scan recovery for damaged files),
// image-to-PDF rebuilding, and base64 payload decoding.

pub mod image;
pub mod payload;
pub mod pdf;
pub mod validate;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export the primary structs so callers can use `pdfcheck_document::PdfReader` etc.
pub use image::extract::{Extraction, ImageExtractor};
pub use pdf::reader::{PdfReader, StrictOpenError};
pub use pdf::writer::PdfWriter;
pub use validate::FormatValidator;
