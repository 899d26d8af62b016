// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-place normalization — rebuild an unusable document from its embedded
// images and atomically replace the original.
//
// The route is chosen by a strict open:
//   missing EOF marker  -> salvage images from the raw bytes
//   other parse failure -> refuse (original untouched)
//   parsed              -> copy pages, then rebuild from images
//
// All output goes to a temp file next to the original; the original is only
// touched by the final rename.

use std::path::{Path, PathBuf};

use pdfcheck_core::error::{PdfCheckError, Result};
use pdfcheck_core::integrity::hash_file;
use pdfcheck_core::{CallId, VerifierConfig};
use pdfcheck_document::{Extraction, ImageExtractor, PdfReader, PdfWriter, StrictOpenError};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Which repair route produced the new document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Strict open found no EOF marker; images were lifted from the raw file.
    Salvage,
    /// Strict open succeeded; pages were copied, then the document was
    /// rebuilt from its images.
    RebuildFromPages,
}

/// A successful normalization. The original path now holds the rebuilt
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub route: Route,
    /// Extracted image files, in page-then-xref order.
    pub images: Vec<PathBuf>,
}

/// Repairs one document in place.
pub struct Normalizer<'a> {
    config: &'a VerifierConfig,
    extractor: ImageExtractor,
    writer: PdfWriter,
}

impl<'a> Normalizer<'a> {
    /// Images are written under `image_dir/<call_id>/`, so concurrent or
    /// successive calls never share image files.
    pub fn new(config: &'a VerifierConfig, call_id: CallId) -> Self {
        Self {
            config,
            extractor: ImageExtractor::new(config.image_dir.join(call_id.to_string())),
            writer: PdfWriter::new(),
        }
    }

    /// Rebuild the document at `path` and replace it.
    ///
    /// On error the file at `path` is byte-for-byte unchanged. Errors are
    /// always one of `Open`, `Extraction`, `Write`, or `Normalization`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn normalize(&self, path: impl AsRef<Path>) -> Result<Normalized> {
        let path = path.as_ref();
        let before = hash_file(path).ok();

        let result = match PdfReader::open_strict(path, self.config.eof_search_window) {
            Err(StrictOpenError::MissingEofMarker) => {
                info!("EOF marker not found, salvaging images");
                self.salvage(path)
            }
            Err(StrictOpenError::Malformed(msg)) => Err(PdfCheckError::Open(msg)),
            Err(StrictOpenError::Io(err)) => Err(PdfCheckError::Open(err.to_string())),
            Ok(reader) => {
                info!(pages = reader.page_count(), "parsed, rebuilding from pages");
                self.rebuild_from_pages(path, reader)
            }
        };

        match result {
            Ok(normalized) => {
                info!(
                    route = ?normalized.route,
                    images = normalized.images.len(),
                    before = before.as_deref().unwrap_or("-"),
                    after = hash_file(path).ok().as_deref().unwrap_or("-"),
                    "document replaced"
                );
                Ok(normalized)
            }
            Err(err) => {
                let err = categorize(err);
                warn!(error = %err, "normalization failed, original untouched");
                Err(err)
            }
        }
    }

    fn salvage(&self, path: &Path) -> Result<Normalized> {
        let data = std::fs::read(path)?;
        let images = self.accept(self.extractor.extract_from_bytes(&data))?;

        let staged = sibling_temp(path)?;
        self.writer.rebuild(&images, staged.path())?;
        replace(staged, path)?;

        Ok(Normalized {
            route: Route::Salvage,
            images,
        })
    }

    fn rebuild_from_pages(&self, path: &Path, reader: PdfReader) -> Result<Normalized> {
        let staged = sibling_temp(path)?;
        reader.write_page_copy(staged.path())?;
        drop(reader);

        // The image rebuild below overwrites the page copy in the same temp
        // file. Only the rebuilt container is kept.
        let images = self.accept(self.extractor.extract_from_path(path))?;
        self.writer.rebuild(&images, staged.path())?;
        replace(staged, path)?;

        Ok(Normalized {
            route: Route::RebuildFromPages,
            images,
        })
    }

    /// Apply the partial-salvage policy to an extraction run.
    fn accept(&self, extraction: Extraction) -> Result<Vec<PathBuf>> {
        let partial = extraction.is_partial();
        match extraction.error {
            None if extraction.images.is_empty() => Err(PdfCheckError::Extraction(
                "no embedded images found".into(),
            )),
            None => Ok(extraction.images),
            Some(err) if !partial => Err(as_extraction(err)),
            Some(err) if self.config.accept_partial_salvage => {
                warn!(
                    kept = extraction.images.len(),
                    error = %err,
                    "using partial extraction"
                );
                Ok(extraction.images)
            }
            Some(err) => {
                debug!(kept = extraction.images.len(), "partial extraction rejected");
                Err(as_extraction(err))
            }
        }
    }
}

/// Temp file in the original's directory, so the final rename stays on one
/// filesystem.
fn sibling_temp(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = tempfile::Builder::new()
        .prefix(".pdfcheck-")
        .suffix(".pdf.tmp")
        .tempfile_in(dir)?;
    debug!(temp = %staged.path().display(), "temp file created");
    Ok(staged)
}

/// Flush the temp file and rename it over `path`, keeping the original's
/// permissions (temp files are created owner-only).
fn replace(staged: NamedTempFile, path: &Path) -> Result<()> {
    let permissions = std::fs::metadata(path)?.permissions();
    staged.as_file().set_permissions(permissions)?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .map_err(|err| PdfCheckError::Write(err.error.to_string()))?;
    Ok(())
}

fn as_extraction(err: PdfCheckError) -> PdfCheckError {
    match err {
        PdfCheckError::Extraction(_) => err,
        other => PdfCheckError::Extraction(other.to_string()),
    }
}

/// Keep the pipeline categories; anything else is a generic normalization
/// failure.
fn categorize(err: PdfCheckError) -> PdfCheckError {
    match err {
        PdfCheckError::Open(_)
        | PdfCheckError::Extraction(_)
        | PdfCheckError::Write(_)
        | PdfCheckError::Normalization(_) => err,
        other => PdfCheckError::Normalization(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfcheck_core::integrity::hash_bytes;
    use pdfcheck_document::fixtures;

    struct Workspace {
        _dir: tempfile::TempDir,
        config: VerifierConfig,
        doc: PathBuf,
    }

    fn workspace(bytes: &[u8]) -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("input.pdf");
        std::fs::write(&doc, bytes).unwrap();
        let config = VerifierConfig {
            image_dir: dir.path().join("images"),
            ..VerifierConfig::default()
        };
        Workspace {
            _dir: dir,
            config,
            doc,
        }
    }

    fn normalize(ws: &Workspace) -> Result<Normalized> {
        Normalizer::new(&ws.config, CallId::new()).normalize(&ws.doc)
    }

    /// Page sizes in points, rounded to whole points.
    fn page_sizes(path: &Path) -> Vec<(f32, f32)> {
        let reader = PdfReader::open(path).unwrap();
        let doc = reader.document();
        reader
            .page_ids()
            .into_iter()
            .map(|id| {
                let page = doc.get_dictionary(id).unwrap();
                let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
                let n = |i: usize| media[i].as_float().unwrap();
                ((n(2) - n(0)).round(), (n(3) - n(1)).round())
            })
            .collect()
    }

    fn leftover_temps(ws: &Workspace) -> usize {
        std::fs::read_dir(ws.doc.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".pdfcheck-"))
            .count()
    }

    #[test]
    fn salvages_unterminated_document() {
        let bytes = fixtures::without_eof_marker(&fixtures::image_pdf(&[
            &[(30, 20)],
            &[(12, 40), (8, 8)],
        ]));
        let ws = workspace(&bytes);

        let normalized = normalize(&ws).unwrap();
        assert_eq!(normalized.route, Route::Salvage);
        assert_eq!(normalized.images.len(), 3);
        let names: Vec<String> = normalized
            .images
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names[0].starts_with("image_1_"));
        assert!(names[1].starts_with("image_2_") && names[2].starts_with("image_2_"));
        assert!(names.iter().all(|name| name.ends_with(".jpg")));
        assert_eq!(
            page_sizes(&ws.doc),
            vec![(30.0, 20.0), (12.0, 40.0), (8.0, 8.0)]
        );
        assert_eq!(leftover_temps(&ws), 0);
    }

    #[test]
    fn rebuilds_parsed_document_from_images() {
        let ws = workspace(&fixtures::image_pdf(&[&[(16, 9)], &[(9, 16)]]));

        let normalized = normalize(&ws).unwrap();
        assert_eq!(normalized.route, Route::RebuildFromPages);
        assert_eq!(normalized.images.len(), 2);
        assert_eq!(page_sizes(&ws.doc), vec![(16.0, 9.0), (9.0, 16.0)]);
        assert_eq!(leftover_temps(&ws), 0);
    }

    #[test]
    fn malformed_document_is_refused_untouched() {
        let bytes = b"%PDF-1.4\nthis is not a pdf body\n%%EOF\n".to_vec();
        let ws = workspace(&bytes);

        let err = normalize(&ws).unwrap_err();
        assert!(matches!(err, PdfCheckError::Open(_)), "{err}");
        assert!(err.to_string().starts_with("Error al abrir PDF original"));
        assert_eq!(std::fs::read(&ws.doc).unwrap(), bytes);
        assert_eq!(leftover_temps(&ws), 0);
    }

    #[test]
    fn no_images_is_an_extraction_error() {
        let bytes = fixtures::blank_pdf(2);
        let ws = workspace(&bytes);

        let err = normalize(&ws).unwrap_err();
        assert!(matches!(err, PdfCheckError::Extraction(_)), "{err}");
        assert_eq!(hash_file(&ws.doc).unwrap(), hash_bytes(&bytes));
        assert_eq!(leftover_temps(&ws), 0);
    }

    #[test]
    fn unterminated_document_without_images_is_untouched() {
        let bytes = fixtures::without_eof_marker(&fixtures::blank_pdf(1));
        let ws = workspace(&bytes);

        let err = normalize(&ws).unwrap_err();
        assert!(matches!(err, PdfCheckError::Extraction(_)), "{err}");
        assert_eq!(std::fs::read(&ws.doc).unwrap(), bytes);
    }

    #[test]
    fn partial_extraction_follows_policy() {
        let bytes = fixtures::partially_extractable_pdf((10, 10));

        let ws = workspace(&bytes);
        let normalized = normalize(&ws).unwrap();
        assert_eq!(normalized.images.len(), 1);
        assert_eq!(page_sizes(&ws.doc), vec![(10.0, 10.0)]);

        let mut ws = workspace(&bytes);
        ws.config.accept_partial_salvage = false;
        let err = normalize(&ws).unwrap_err();
        assert!(matches!(err, PdfCheckError::Extraction(_)), "{err}");
        assert_eq!(std::fs::read(&ws.doc).unwrap(), bytes);
    }

    #[test]
    fn images_land_in_a_directory_per_call() {
        let ws = workspace(&fixtures::image_pdf(&[&[(30, 20)]]));
        let call_id = CallId::new();

        let normalized = Normalizer::new(&ws.config, call_id)
            .normalize(&ws.doc)
            .unwrap();
        let expected_dir = ws.config.image_dir.join(call_id.to_string());
        assert!(
            normalized
                .images
                .iter()
                .all(|image| image.parent() == Some(expected_dir.as_path()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn replacement_keeps_original_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let ws = workspace(&fixtures::without_eof_marker(&fixtures::image_pdf(&[&[(8, 8)]])));
        std::fs::set_permissions(&ws.doc, std::fs::Permissions::from_mode(0o640)).unwrap();

        normalize(&ws).unwrap();
        let mode = std::fs::metadata(&ws.doc).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let config = VerifierConfig::default();
        let err = Normalizer::new(&config, CallId::new())
            .normalize("/no/such/dir/input.pdf")
            .unwrap_err();
        assert!(matches!(err, PdfCheckError::Open(_)));
    }

    #[test]
    fn uncategorized_errors_become_normalization_errors() {
        let err = categorize(PdfCheckError::Pdf("boom".into()));
        assert!(matches!(err, PdfCheckError::Normalization(_)));
        assert!(matches!(
            categorize(PdfCheckError::Write("x".into())),
            PdfCheckError::Write(_)
        ));
    }
}
