// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic documents for tests and benchmarks.
//
// Every builder panics on failure: these only run under test harnesses.

use std::io::Cursor;

use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Encode a `width` x `height` gradient as a baseline JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .expect("encode fixture JPEG");
    out.into_inner()
}

/// A PDF with one Helvetica text line per entry in `pages`.
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }));
    }

    finish(doc, pages_id, kids)
}

/// A PDF with pages that have neither text nor images.
pub fn blank_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for _ in 0..page_count {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {},
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }));
    }
    finish(doc, pages_id, kids)
}

/// A PDF whose pages each draw the listed JPEG images (pixel sizes).
pub fn image_pdf(pages: &[&[(u32, u32)]]) -> Vec<u8> {
    build_image_pdf(pages, false)
}

/// Like [`image_pdf`], but every page's content ends in a text block whose
/// `Tf` lacks its operands, so text extraction fails on every page. Pair it
/// with [`without_eof_marker`] for a scan that needs salvaging.
pub fn damaged_scan_pdf(pages: &[&[(u32, u32)]]) -> Vec<u8> {
    build_image_pdf(pages, true)
}

fn build_image_pdf(pages: &[&[(u32, u32)]], broken_text: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for images in pages {
        let mut xobjects = lopdf::Dictionary::new();
        let mut operations = Vec::new();
        for (index, &(width, height)) in images.iter().enumerate() {
            let name = format!("Im{}", index + 1);
            let image_id = add_jpeg(&mut doc, width, height);
            xobjects.set(name.clone(), image_id);
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    0.into(),
                    0.into(),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }
        if broken_text {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            Content { operations }.encode().expect("encode content"),
        ));
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }));
    }

    finish(doc, pages_id, kids)
}

/// A one-page image PDF whose /Resources live on the /Pages node.
pub fn image_pdf_with_inherited_resources((width, height): (u32, u32)) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = add_jpeg(&mut doc, width, height);
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"q /Im1 Do Q".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
        }),
    );
    save_with_catalog(doc, pages_id)
}

/// A one-page PDF with a JPEG followed by a CMYK raw-sample image, which
/// cannot be re-encoded. Extraction stops after the first image.
pub fn partially_extractable_pdf((width, height): (u32, u32)) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let jpeg_id = add_jpeg(&mut doc, width, height);
    let cmyk_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceCMYK",
            "BitsPerComponent" => 8,
        },
        vec![0u8; 16],
    ));
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"q /Im1 Do Q q /Im2 Do Q".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im1" => jpeg_id, "Im2" => cmyk_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    finish(doc, pages_id, vec![page_id])
}

/// Drop the trailing `%%EOF` marker (and anything after it).
pub fn without_eof_marker(bytes: &[u8]) -> Vec<u8> {
    let position = bytes
        .windows(5)
        .rposition(|window| window == b"%%EOF")
        .expect("fixture has an EOF marker");
    bytes[..position].to_vec()
}

fn add_jpeg(doc: &mut Document, width: u32, height: u32) -> ObjectId {
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg_bytes(width, height),
    ))
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<ObjectId>) -> Vec<u8> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );
    save_with_catalog(doc, pages_id)
}

fn save_with_catalog(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture PDF");
    out
}
