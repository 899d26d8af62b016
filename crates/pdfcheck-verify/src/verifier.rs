// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Top-level verification — the single entry point for callers. Every outcome,
// including failures, comes back as a `VerificationResult`.

use std::path::Path;
use std::sync::Arc;

use pdfcheck_core::error::{PdfCheckError, Result};
use pdfcheck_core::{
    CallId, MSG_NORMALIZE_FAILED, MSG_UNEXPECTED, ScanReport, VerificationResult,
    VerifierConfig,
};
use pdfcheck_document::{FormatValidator, payload};
use tracing::{info, instrument, warn};

use crate::normalize::Normalizer;

/// Request-scoped verification service.
///
/// Holds only shared, read-only configuration; construct one per request.
#[derive(Debug, Clone)]
pub struct Verifier {
    config: Arc<VerifierConfig>,
}

impl Verifier {
    pub fn new(config: Arc<VerifierConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify the document at `path`, repairing it in place if unusable.
    pub fn verify_path(&self, path: impl AsRef<Path>) -> VerificationResult {
        self.verify_file(CallId::new(), path.as_ref())
    }

    /// Verify a base64-encoded document.
    ///
    /// The decoded bytes are staged in a unique temp file which is removed
    /// once verification finishes.
    pub fn verify_blob(&self, blob: &str) -> VerificationResult {
        self.verify_payload(CallId::new(), blob)
    }

    /// Verify every regular file directly inside `dir`.
    pub fn scan_directory(&self, dir: impl AsRef<Path>) -> Result<ScanReport> {
        crate::batch::scan_directory(self, dir)
    }

    #[instrument(skip_all, fields(call_id = %call_id, blob_len = blob.len()))]
    fn verify_payload(&self, call_id: CallId, blob: &str) -> VerificationResult {
        let bytes = match payload::decode(blob) {
            Ok(bytes) => bytes,
            Err(err) => {
                info!(error = %err, "payload rejected");
                return VerificationResult::invalid(err.to_string());
            }
        };

        let staged = match payload::stage(&bytes, &self.config.staging_dir()) {
            Ok(staged) => staged,
            Err(err) => {
                warn!(error = %err, "cannot stage payload");
                return VerificationResult::invalid(format!("{MSG_UNEXPECTED}{err}"));
            }
        };

        self.verify_file(call_id, staged.path())
    }

    #[instrument(skip_all, fields(call_id = %call_id, path = %path.display()))]
    fn verify_file(&self, call_id: CallId, path: &Path) -> VerificationResult {
        if let Err(err) = check_preconditions(path) {
            info!(error = %err, "precondition failed");
            return match err {
                PdfCheckError::NotAPdf | PdfCheckError::EmptyFile => {
                    VerificationResult::invalid(err.to_string())
                }
                other => VerificationResult::invalid(format!("{MSG_UNEXPECTED}{other}")),
            };
        }

        if FormatValidator::is_valid(path) {
            info!("document is valid");
            return VerificationResult::valid();
        }

        info!("document is invalid, normalizing");
        match Normalizer::new(&self.config, call_id).normalize(path) {
            Ok(normalized) => VerificationResult::normalized(normalized.images),
            Err(err) => VerificationResult::invalid(format!("{MSG_NORMALIZE_FAILED}{err}")),
        }
    }
}

/// `.pdf` extension (any case) and non-zero length.
fn check_preconditions(path: &Path) -> Result<()> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(PdfCheckError::NotAPdf);
    }
    if std::fs::metadata(path)?.len() == 0 {
        return Err(PdfCheckError::EmptyFile);
    }
    Ok(())
}
