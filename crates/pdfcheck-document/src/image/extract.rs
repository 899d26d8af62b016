// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded image extraction — walk every page of a document and write each
// image XObject to `image_{page}_{xref}.{ext}`.
//
// JPEG and JPEG 2000 streams are written exactly as stored. Other streams are
// decompressed and, when they hold 8-bit gray or RGB samples, re-encoded as
// PNG with the `image` crate.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ::image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdfcheck_core::ImageFormat;
use pdfcheck_core::error::{PdfCheckError, Result};
use tracing::{debug, info, instrument, warn};

use super::recover;
use crate::pdf::reader::PdfReader;
use crate::pdf::resources::page_image_ids;

/// One image pulled out of a document, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// Object number of the image XObject.
    pub xref: u32,
    /// 0-based index of the page the image was found on.
    pub page_index: usize,
    pub format: ImageFormat,
    /// Encoded image bytes.
    pub data: Vec<u8>,
}

impl EmbeddedImage {
    /// File name under the extraction naming contract.
    pub fn file_name(&self) -> String {
        format!(
            "image_{}_{}.{}",
            self.page_index + 1,
            self.xref,
            self.format.extension()
        )
    }
}

/// Outcome of an extraction run.
///
/// `images` holds every file written, in page-then-xref order. `error` is the
/// failure that stopped the run early, if any; the images written before it
/// are still listed.
#[derive(Debug, Default)]
pub struct Extraction {
    pub images: Vec<PathBuf>,
    pub error: Option<PdfCheckError>,
}

impl Extraction {
    fn failed(error: PdfCheckError) -> Self {
        Self {
            images: Vec::new(),
            error: Some(error),
        }
    }

    /// No image was written.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Some images were written before a failure stopped the run.
    pub fn is_partial(&self) -> bool {
        !self.images.is_empty() && self.error.is_some()
    }

    /// Every image was written without error.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Writes the embedded images of PDF documents into one output directory.
pub struct ImageExtractor {
    out_dir: PathBuf,
}

impl ImageExtractor {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Extract every image from the PDF at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn extract_from_path(&self, path: impl AsRef<Path>) -> Extraction {
        match std::fs::read(path.as_ref()) {
            Ok(data) => self.extract_from_bytes(&data),
            Err(err) => Extraction::failed(err.into()),
        }
    }

    /// Extract every image from PDF bytes.
    ///
    /// The document is opened leniently. If even that fails, image streams
    /// are recovered by scanning the raw bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn extract_from_bytes(&self, data: &[u8]) -> Extraction {
        match PdfReader::from_bytes(data) {
            Ok(reader) => self.extract_from_reader(&reader),
            Err(err) => {
                warn!(%err, "document unreadable, scanning raw bytes for images");
                let recovered = recover::scan_images(data);
                if recovered.is_empty() {
                    return Extraction::failed(PdfCheckError::Extraction(err.to_string()));
                }
                self.write_all(recovered.into_iter().map(Ok))
            }
        }
    }

    /// Extract every image from an already-open document.
    pub fn extract_from_reader(&self, reader: &PdfReader) -> Extraction {
        let doc = reader.document();
        let items = reader
            .page_ids()
            .into_iter()
            .enumerate()
            .flat_map(move |(page_index, page_id)| {
                page_image_ids(doc, page_id)
                    .into_iter()
                    .map(move |id| decode_embedded(doc, page_index, id))
            });
        self.write_all(items)
    }

    /// Write images in order until the first failure.
    fn write_all(&self, items: impl IntoIterator<Item = Result<EmbeddedImage>>) -> Extraction {
        if let Err(err) = std::fs::create_dir_all(&self.out_dir) {
            return Extraction::failed(err.into());
        }

        let mut extraction = Extraction::default();
        for item in items {
            match item.and_then(|image| self.write_image(&image)) {
                Ok(path) => extraction.images.push(path),
                Err(err) => {
                    warn!(
                        extracted = extraction.images.len(),
                        error = %err,
                        "image extraction stopped early"
                    );
                    extraction.error = Some(err);
                    break;
                }
            }
        }

        info!(count = extraction.images.len(), "Images extracted");
        extraction
    }

    fn write_image(&self, image: &EmbeddedImage) -> Result<PathBuf> {
        let path = self.out_dir.join(image.file_name());
        std::fs::write(&path, &image.data).map_err(|err| {
            PdfCheckError::Extraction(format!("{}: {}", path.display(), err))
        })?;
        debug!(path = %path.display(), bytes = image.data.len(), "Image written");
        Ok(path)
    }
}

/// Read the image XObject `id` and encode it for writing.
fn decode_embedded(doc: &Document, page_index: usize, id: ObjectId) -> Result<EmbeddedImage> {
    let stream = doc
        .get_object(id)
        .and_then(Object::as_stream)
        .map_err(|err| PdfCheckError::Extraction(format!("object {} {}: {}", id.0, id.1, err)))?;
    let (format, data) = encode_stream(doc, stream)
        .map_err(|err| PdfCheckError::Extraction(format!("object {} {}: {}", id.0, id.1, err)))?;
    Ok(EmbeddedImage {
        xref: id.0,
        page_index,
        format,
        data,
    })
}

fn encode_stream(
    doc: &Document,
    stream: &Stream,
) -> std::result::Result<(ImageFormat, Vec<u8>), String> {
    let filters = stream_filters(&stream.dict);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => Ok((ImageFormat::Jpeg, stream.content.clone())),
        Some(b"JPXDecode") if filters.len() == 1 => {
            Ok((ImageFormat::Jpeg2000, stream.content.clone()))
        }
        Some(b"DCTDecode" | b"JPXDecode") => Err("unsupported filter chain".into()),
        _ => {
            let samples = if filters.is_empty() {
                stream.content.clone()
            } else {
                stream
                    .decompressed_content()
                    .map_err(|err| format!("cannot decompress samples: {}", err))?
            };
            Ok((ImageFormat::Png, samples_to_png(doc, &stream.dict, samples)?))
        }
    }
}

/// Filter names applied to a stream, in application order.
fn stream_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(names)) => names
            .iter()
            .filter_map(|obj| obj.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Re-encode raw 8-bit gray or RGB samples as PNG.
fn samples_to_png(
    doc: &Document,
    dict: &Dictionary,
    mut samples: Vec<u8>,
) -> std::result::Result<Vec<u8>, String> {
    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return Err(format!("unsupported bits per component: {}", bits));
    }
    let components = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|cs| color_components(doc, cs, 0))
        .ok_or("unsupported colour space")?;

    let expected = width as usize * height as usize * components;
    if samples.len() < expected {
        return Err(format!(
            "sample data too short: {} bytes for {}x{}x{}",
            samples.len(),
            width,
            height,
            components
        ));
    }
    samples.truncate(expected);

    let image = match components {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        _ => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
    }
    .ok_or("sample buffer does not match dimensions")?;

    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ::image::ImageFormat::Png)
        .map_err(|err| format!("PNG encoding failed: {}", err))?;
    Ok(out.into_inner())
}

fn dimension(dict: &Dictionary, key: &[u8]) -> std::result::Result<u32, String> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|value| u32::try_from(value).ok())
        .filter(|value| *value > 0)
        .ok_or_else(|| format!("missing or invalid /{}", String::from_utf8_lossy(key)))
}

/// Number of colour components for gray or RGB colour spaces.
fn color_components(doc: &Document, color_space: &Object, depth: usize) -> Option<usize> {
    if depth > 4 {
        return None;
    }
    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let profile = items.get(1)?.as_reference().ok()?;
                    let stream = doc.get_object(profile).and_then(Object::as_stream).ok()?;
                    match stream.dict.get(b"N").and_then(Object::as_i64).ok()? {
                        1 => Some(1),
                        3 => Some(3),
                        _ => None,
                    }
                }
                _ => color_components(doc, items.first()?, depth + 1),
            }
        }
        Object::Reference(id) => color_components(doc, doc.get_object(*id).ok()?, depth + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use lopdf::dictionary;

    #[test]
    fn file_names_follow_page_then_xref_contract() {
        let image = EmbeddedImage {
            xref: 12,
            page_index: 2,
            format: ImageFormat::Jpeg,
            data: Vec::new(),
        };
        assert_eq!(image.file_name(), "image_3_12.jpg");
    }

    #[test]
    fn extracts_jpegs_in_page_then_xref_order() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = fixtures::image_pdf(&[&[(8, 6), (5, 5)], &[(4, 9)]]);
        let extraction = ImageExtractor::new(dir.path()).extract_from_bytes(&bytes);

        assert!(extraction.is_complete());
        assert_eq!(extraction.images.len(), 3);

        let names: Vec<String> = extraction
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names[0].starts_with("image_1_"));
        assert!(names[1].starts_with("image_1_"));
        assert!(names[2].starts_with("image_2_"));
        assert!(names.iter().all(|n| n.ends_with(".jpg")));

        let first = ::image::open(&extraction.images[0]).unwrap();
        assert_eq!((first.width(), first.height()), (8, 6));
    }

    #[test]
    fn extracts_from_unterminated_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = fixtures::without_eof_marker(&fixtures::image_pdf(&[&[(4, 4)], &[(6, 6)]]));
        let extraction = ImageExtractor::new(dir.path()).extract_from_bytes(&bytes);
        assert_eq!(extraction.images.len(), 2);
        assert!(extraction.error.is_none());
    }

    #[test]
    fn text_only_document_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let extraction =
            ImageExtractor::new(dir.path()).extract_from_bytes(&fixtures::text_pdf(&["words"]));
        assert!(extraction.is_empty());
        assert!(extraction.is_complete());
    }

    #[test]
    fn garbage_reports_error_without_images() {
        let dir = tempfile::tempdir().unwrap();
        let extraction = ImageExtractor::new(dir.path()).extract_from_bytes(b"not a pdf");
        assert!(extraction.is_empty());
        assert!(matches!(extraction.error, Some(PdfCheckError::Extraction(_))));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let extraction =
            ImageExtractor::new(dir.path()).extract_from_path(dir.path().join("absent.pdf"));
        assert!(matches!(extraction.error, Some(PdfCheckError::Io(_))));
    }

    #[test]
    fn raw_rgb_samples_become_png() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Width" => 2,
            "Height" => 1,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        let stream = Stream::new(dict, vec![255, 0, 0, 0, 255, 0]);
        let (format, png) = encode_stream(&doc, &stream).unwrap();
        assert_eq!(format, ImageFormat::Png);
        let decoded = ::image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn cmyk_samples_are_rejected() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceCMYK",
            "BitsPerComponent" => 8,
        };
        let stream = Stream::new(dict, vec![0, 0, 0, 0]);
        assert!(encode_stream(&doc, &stream).is_err());
    }

    #[test]
    fn short_sample_data_is_rejected() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Width" => 4,
            "Height" => 4,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        };
        let stream = Stream::new(dict, vec![0; 3]);
        assert!(encode_stream(&doc, &stream).unwrap_err().contains("too short"));
    }
}
