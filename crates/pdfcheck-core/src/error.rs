// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for pdfcheck.
//
// Display strings are the human-facing wording returned to callers of the
// verification service, so they stay in the service's language (Spanish).

use thiserror::Error;

/// Top-level error type for all pdfcheck operations.
#[derive(Debug, Error)]
pub enum PdfCheckError {
    // -- Payload errors --
    #[error("Error al decodificar base64: {0}")]
    Decode(String),

    #[error("La cadena base64 no contiene datos.")]
    EmptyPayload,

    // -- Precondition errors --
    #[error("No es un archivo PDF.")]
    NotAPdf,

    #[error("Archivo vacio.")]
    EmptyFile,

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    // -- Normalization errors --
    #[error("Error al abrir PDF original: {0}")]
    Open(String),

    #[error("Error al extraer imagenes: {0}")]
    Extraction(String),

    #[error("Error al escribir PDF normalizado: {0}")]
    Write(String),

    #[error("Error de normalizacion: {0}")]
    Normalization(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Request layer --
    #[error("server error: {0}")]
    Server(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PdfCheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_and_empty_file_read_differently() {
        assert_ne!(
            PdfCheckError::EmptyPayload.to_string(),
            PdfCheckError::EmptyFile.to_string()
        );
    }

    #[test]
    fn detail_is_carried_into_message() {
        let err = PdfCheckError::Open("EOF marker not found".into());
        assert_eq!(
            err.to_string(),
            "Error al abrir PDF original: EOF marker not found"
        );
    }
}
