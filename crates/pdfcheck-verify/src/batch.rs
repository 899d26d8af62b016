// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Directory scanning — verify every regular file in one directory and
// partition the outcomes.

use std::path::Path;

use pdfcheck_core::error::Result;
use pdfcheck_core::{ResultEntry, ScanReport};
use tracing::{debug, info, instrument};

use crate::verifier::Verifier;

/// Verify each regular file directly inside `dir` (no recursion).
///
/// Entries are visited in directory-listing order. Only failing to list the
/// directory is an error; per-file failures land in `invalid_files`.
#[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn scan_directory(verifier: &Verifier, dir: impl AsRef<Path>) -> Result<ScanReport> {
    let dir = dir.as_ref();
    let mut report = ScanReport {
        directory: dir.display().to_string(),
        ..ScanReport::default()
    };

    // Snapshot the listing first: repairs create and rename temp files in
    // this same directory.
    let entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            debug!(path = %path.display(), "skipping non-file entry");
            continue;
        }

        let result = verifier.verify_path(&path);
        let entry = ResultEntry {
            file: entry.file_name().to_string_lossy().into_owned(),
            message: result.message,
            images: result.images,
        };
        if result.is_valid {
            report.valid_files.push(entry);
        } else {
            report.invalid_files.push(entry);
        }
    }

    info!(
        valid = report.valid_files.len(),
        invalid = report.invalid_files.len(),
        "directory scanned"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pdfcheck_core::{MSG_NORMALIZED, MSG_VALID, VerifierConfig};
    use pdfcheck_document::fixtures;

    use super::*;

    #[test]
    fn partitions_regular_files_and_skips_subdirectories() {
        let root = tempfile::tempdir().unwrap();
        let docs = root.path().join("docs");
        std::fs::create_dir(&docs).unwrap();

        std::fs::write(docs.join("a.pdf"), fixtures::text_pdf(&["uno"])).unwrap();
        std::fs::write(
            docs.join("b.pdf"),
            fixtures::without_eof_marker(&fixtures::damaged_scan_pdf(&[&[(6, 6)]])),
        )
        .unwrap();
        std::fs::write(docs.join("c.pdf"), fixtures::blank_pdf(1)).unwrap();
        std::fs::write(docs.join("d.txt"), b"not a pdf").unwrap();
        std::fs::write(docs.join("e.pdf"), b"").unwrap();
        std::fs::create_dir(docs.join("nested.pdf")).unwrap();
        std::fs::write(docs.join("nested.pdf").join("x.pdf"), fixtures::text_pdf(&["x"])).unwrap();

        let verifier = Verifier::new(Arc::new(VerifierConfig {
            image_dir: root.path().join("images"),
            ..VerifierConfig::default()
        }));
        let report = scan_directory(&verifier, &docs).unwrap();

        assert_eq!(report.total(), 5);
        assert_eq!(report.directory, docs.display().to_string());

        let mut valid: Vec<_> = report
            .valid_files
            .iter()
            .map(|e| (e.file.as_str(), e.message.as_str()))
            .collect();
        valid.sort();
        assert_eq!(valid, vec![("a.pdf", MSG_VALID), ("b.pdf", MSG_NORMALIZED)]);

        let mut invalid: Vec<_> = report.invalid_files.iter().map(|e| e.file.as_str()).collect();
        invalid.sort();
        assert_eq!(invalid, vec!["c.pdf", "d.txt", "e.pdf"]);

        let salvaged = report.valid_files.iter().find(|e| e.file == "b.pdf").unwrap();
        assert_eq!(salvaged.images.len(), 1);
    }

    #[test]
    fn reported_images_belong_to_their_own_file() {
        let root = tempfile::tempdir().unwrap();
        let docs = root.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        for (name, size) in [("a.pdf", (30, 20)), ("b.pdf", (7, 9))] {
            std::fs::write(
                docs.join(name),
                fixtures::without_eof_marker(&fixtures::damaged_scan_pdf(&[&[size]])),
            )
            .unwrap();
        }

        let verifier = Verifier::new(Arc::new(VerifierConfig {
            image_dir: root.path().join("images"),
            ..VerifierConfig::default()
        }));
        let report = scan_directory(&verifier, &docs).unwrap();
        assert_eq!(report.valid_files.len(), 2);

        for entry in &report.valid_files {
            let expected = match entry.file.as_str() {
                "a.pdf" => fixtures::jpeg_bytes(30, 20),
                _ => fixtures::jpeg_bytes(7, 9),
            };
            assert_eq!(entry.images.len(), 1);
            assert_eq!(std::fs::read(&entry.images[0]).unwrap(), expected, "{}", entry.file);
        }
    }

    #[test]
    fn empty_directory_gives_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = Verifier::new(Arc::new(VerifierConfig::default()));
        let report = scan_directory(&verifier, dir.path()).unwrap();
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn unlistable_directory_is_an_error() {
        let verifier = Verifier::new(Arc::new(VerifierConfig::default()));
        assert!(scan_directory(&verifier, "/no/such/directory").is_err());
    }
}
