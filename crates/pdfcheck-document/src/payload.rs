// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payload guard — decode base64-encoded documents and stage them on disk
// under a name unique to the call.

use std::io::Write;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pdfcheck_core::error::{PdfCheckError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Decode a standard (padded) base64 string. Surrounding whitespace is
/// ignored. An empty result is rejected.
#[instrument(skip_all, fields(blob_len = blob.len()))]
pub fn decode(blob: &str) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(blob.trim())
        .map_err(|err| PdfCheckError::Decode(err.to_string()))?;
    if bytes.is_empty() {
        return Err(PdfCheckError::EmptyPayload);
    }
    debug!(bytes = bytes.len(), "payload decoded");
    Ok(bytes)
}

/// Write decoded bytes to a fresh `.pdf` temp file inside `dir`.
///
/// The file is removed when the returned handle is dropped.
pub fn stage(bytes: &[u8], dir: &Path) -> Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("payload-")
        .suffix(".pdf")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    debug!(path = %file.path().display(), "payload staged");
    Ok(file)
}
