// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw-scan image recovery for documents the parser cannot open.
//
// Walks the file front to back collecting `N G obj` bodies without relying on
// the cross-reference table. Each page object's references are then followed
// (through resource dictionaries, never into other pages) to attribute image
// streams to pages. Only JPEG and JPEG 2000 streams are lifted out, verbatim:
// streams holding raw samples cannot be trusted without a parsed dictionary.

use std::collections::{HashMap, HashSet};

use pdfcheck_core::ImageFormat;
use tracing::{debug, warn};

use super::extract::EmbeddedImage;
use crate::pdf::raw::{RawObject, has_name, has_name_pair, references, scan_objects};

/// Reference depth followed from a page dictionary.
const MAX_REFERENCE_DEPTH: usize = 3;

/// Recover every self-describing image stream from raw PDF bytes.
///
/// Images are returned page by page; images no page refers to come last,
/// attributed to the final page.
pub fn scan_images(data: &[u8]) -> Vec<EmbeddedImage> {
    let objects = scan_objects(data);
    let by_number: HashMap<u32, &RawObject> =
        objects.iter().map(|obj| (obj.number, obj)).collect();
    let pages: Vec<&RawObject> = objects
        .iter()
        .filter(|obj| obj.stream.is_none() && is_page(&data[obj.dict.clone()]))
        .collect();

    let mut images = Vec::new();
    let mut taken = HashSet::new();

    for (page_index, page) in pages.iter().enumerate() {
        let mut visited = HashSet::from([page.number]);
        let mut frontier = references(&data[page.dict.clone()]);
        for _ in 0..MAX_REFERENCE_DEPTH {
            let mut next = Vec::new();
            for number in frontier {
                if !visited.insert(number) {
                    continue;
                }
                let Some(obj) = by_number.get(&number) else {
                    continue;
                };
                let dict = &data[obj.dict.clone()];
                if obj.stream.is_some() {
                    if is_image(dict) && taken.insert(number) {
                        push_image(data, obj, page_index, &mut images);
                    }
                } else if !is_page(dict) && !is_page_tree(dict) {
                    next.extend(references(dict));
                }
            }
            frontier = next;
        }
    }

    let last_page = pages.len().saturating_sub(1);
    for obj in objects.iter().filter(|obj| obj.stream.is_some()) {
        if is_image(&data[obj.dict.clone()]) && taken.insert(obj.number) {
            push_image(data, obj, last_page, &mut images);
        }
    }

    debug!(recovered = images.len(), pages = pages.len(), "Raw scan complete");
    images
}

fn push_image(data: &[u8], obj: &RawObject, page_index: usize, images: &mut Vec<EmbeddedImage>) {
    let Some(payload) = obj.stream.clone() else {
        return;
    };
    match self_describing_format(&data[obj.dict.clone()]) {
        Some(format) => images.push(EmbeddedImage {
            xref: obj.number,
            page_index,
            format,
            data: data[payload].to_vec(),
        }),
        None => warn!(xref = obj.number, "skipping raw-sample image during recovery"),
    }
}

fn is_image(dict: &[u8]) -> bool {
    has_name_pair(dict, b"Subtype", b"Image")
}

fn is_page(dict: &[u8]) -> bool {
    has_name_pair(dict, b"Type", b"Page")
}

fn is_page_tree(dict: &[u8]) -> bool {
    has_name_pair(dict, b"Type", b"Pages") || has_name_pair(dict, b"Type", b"Catalog")
}

fn self_describing_format(dict: &[u8]) -> Option<ImageFormat> {
    if has_name(dict, b"FlateDecode") || has_name(dict, b"LZWDecode") {
        return None;
    }
    if has_name(dict, b"DCTDecode") {
        Some(ImageFormat::Jpeg)
    } else if has_name(dict, b"JPXDecode") {
        Some(ImageFormat::Jpeg2000)
    } else {
        None
    }
}
