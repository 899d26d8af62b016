// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — rebuild a container document from extracted images using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::path::{Path, PathBuf};

use pdfcheck_core::error::{PdfCheckError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

/// Images are placed at 72 DPI so one pixel maps to one PDF point.
const POINTS_PER_INCH: f32 = 72.0;

/// Title metadata embedded in the PDF /Info dictionary.
const DOCUMENT_TITLE: &str = "Documento normalizado";

/// Builds one page per image, each page sized exactly to its image.
#[derive(Debug, Default)]
pub struct PdfWriter;

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Build the container document in memory.
    ///
    /// Pages follow the order of `image_paths`. An empty list is an error:
    /// a document with no pages is not a usable container.
    #[instrument(skip(self, image_paths), fields(images = image_paths.len()))]
    pub fn rebuild_from_images(&self, image_paths: &[PathBuf]) -> Result<Vec<u8>> {
        if image_paths.is_empty() {
            return Err(PdfCheckError::Extraction(
                "no images available to rebuild the document".into(),
            ));
        }

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let mut pages: Vec<PdfPage> = Vec::with_capacity(image_paths.len());

        for path in image_paths {
            let (raw, width, height) = load_rgb(path)?;
            let xobject_id = doc.add_image(&raw);

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(1.0),
                    scale_y: Some(1.0),
                    dpi: Some(POINTS_PER_INCH),
                    rotate: None,
                },
            }];

            debug!(path = %path.display(), width, height, "Image placed on page");
            pages.push(PdfPage::new(
                points_to_mm(width),
                points_to_mm(height),
                ops,
            ));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(
            bytes = output.len(),
            warnings = warnings.len(),
            "Container document serialised"
        );

        Ok(output)
    }

    /// Build the container document and write it to `output`, overwriting.
    pub fn rebuild(&self, image_paths: &[PathBuf], output: impl AsRef<Path>) -> Result<()> {
        let bytes = self.rebuild_from_images(image_paths)?;
        std::fs::write(output.as_ref(), &bytes).map_err(|err| {
            PdfCheckError::Write(format!("{}: {err}", output.as_ref().display()))
        })?;
        info!(
            pages = image_paths.len(),
            "Wrote rebuilt PDF to {}",
            output.as_ref().display()
        );
        Ok(())
    }
}

/// Decode an image file into RGB8 samples for printpdf.
fn load_rgb(path: &Path) -> Result<(RawImage, u32, u32)> {
    let decoded = ::image::open(path).map_err(|err| {
        PdfCheckError::Write(format!(
            "failed to decode image {}: {err}",
            path.display()
        ))
    })?;

    let width = decoded.width();
    let height = decoded.height();
    let rgb = decoded.to_rgb8();

    let raw = RawImage {
        pixels: RawImageData::U8(rgb.into_raw()),
        width: width as usize,
        height: height as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };
    Ok((raw, width, height))
}

fn points_to_mm(points: u32) -> Mm {
    Mm(points as f32 * 25.4 / POINTS_PER_INCH)
}
