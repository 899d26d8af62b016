// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open documents strictly or leniently, inspect pages, and copy
// every page into a fresh document using the `lopdf` crate.

use std::collections::HashMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use pdfcheck_core::error::PdfCheckError;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::raw;

/// Default number of trailing bytes searched for the `%%EOF` marker.
pub const DEFAULT_EOF_WINDOW: usize = 1024;

/// Marker that terminates a well-formed PDF file.
const EOF_MARKER: &[u8] = b"%%EOF";

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Why a strict open was refused.
#[derive(Debug, Error)]
pub enum StrictOpenError {
    /// The file does not end with a `%%EOF` marker (truncated or unterminated).
    #[error("EOF marker not found")]
    MissingEofMarker,

    /// The bytes could not be parsed as a PDF.
    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document`. A reader is opened for one operation and dropped
/// right after; it never outlives the call that created it.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF leniently: a missing `%%EOF` marker is tolerated.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PdfCheckError> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)?;
        let mut reader = Self::from_bytes(&data)?;
        reader.source_path = Some(path_ref.display().to_string());
        Ok(reader)
    }

    /// Load a PDF leniently from bytes already in memory.
    ///
    /// A file lacking its `%%EOF` marker is repaired in memory before giving
    /// up: first by re-terminating it after its `startxref` offset, then by
    /// rebuilding the cross-reference table from the objects in the file.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, PdfCheckError> {
        let document = match Document::load_mem(data) {
            Ok(document) => document,
            Err(err) if !has_eof_marker(data, DEFAULT_EOF_WINDOW) => {
                debug!(%err, "parse failed on unterminated file, repairing trailer");
                load_unterminated(data)?
            }
            Err(err) => {
                return Err(PdfCheckError::Pdf(format!("failed to load PDF: {}", err)));
            }
        };

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    /// Open a PDF strictly: the file must end with `%%EOF` within the last
    /// `eof_window` bytes and must parse completely.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_strict(
        path: impl AsRef<Path>,
        eof_window: usize,
    ) -> Result<Self, StrictOpenError> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)?;

        if !has_eof_marker(&data, eof_window) {
            info!(bytes_len = data.len(), "strict open refused: no EOF marker");
            return Err(StrictOpenError::MissingEofMarker);
        }

        let document = Document::load_mem(&data)
            .map_err(|err| StrictOpenError::Malformed(err.to_string()))?;

        debug!(pages = document.get_pages().len(), "PDF opened strictly");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created from a file.
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Borrow the underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // get_pages is keyed by 1-indexed page number, so values come out ordered.
        self.document.get_pages().into_values().collect()
    }

    /// Extract the text of a single page (1-indexed).
    pub fn page_text(&self, page_number: u32) -> Result<String, PdfCheckError> {
        self.document.extract_text(&[page_number]).map_err(|err| {
            PdfCheckError::Pdf(format!("text extraction failed on page {}: {}", page_number, err))
        })
    }

    // -- Page copy ------------------------------------------------------------

    /// Copy every page, in order, into a new standalone document and return
    /// its serialised bytes.
    #[instrument(skip(self))]
    pub fn copy_pages(&self) -> Result<Vec<u8>, PdfCheckError> {
        let mut target = empty_document();
        let mut cloned = HashMap::new();

        for page_id in self.page_ids() {
            clone_page_into(&self.document, &mut target, page_id, &mut cloned)?;
        }

        let mut output = Vec::new();
        target.save_to(&mut output).map_err(|err| {
            PdfCheckError::Write(format!("failed to serialise copied pages: {}", err))
        })?;

        debug!(pages = self.page_count(), output_bytes = output.len(), "Pages copied");
        Ok(output)
    }

    /// Copy every page into a new document written to `path`.
    pub fn write_page_copy(&self, path: impl AsRef<Path>) -> Result<(), PdfCheckError> {
        let bytes = self.copy_pages()?;
        std::fs::write(path.as_ref(), &bytes).map_err(|err| {
            PdfCheckError::Write(format!("{}: {}", path.as_ref().display(), err))
        })?;
        info!("Wrote page copy to {}", path.as_ref().display());
        Ok(())
    }
}

/// Whether `%%EOF` occurs within the last `window` bytes of `data`.
pub fn has_eof_marker(data: &[u8], window: usize) -> bool {
    let start = data.len().saturating_sub(window);
    data[start..]
        .windows(EOF_MARKER.len())
        .any(|chunk| chunk == EOF_MARKER)
}

/// Parse a file whose `%%EOF` marker is missing.
fn load_unterminated(data: &[u8]) -> Result<Document, PdfCheckError> {
    let err = match Document::load_mem(&reterminate(data)) {
        Ok(document) => return Ok(document),
        Err(err) => err,
    };
    debug!(%err, "re-terminated parse failed, rebuilding cross-reference table");

    let rebuilt = raw::rebuild_xref(data)
        .ok_or_else(|| PdfCheckError::Pdf(format!("failed to load PDF: {}", err)))?;
    Document::load_mem(&rebuilt)
        .map_err(|err| PdfCheckError::Pdf(format!("failed to load PDF: {}", err)))
}

/// `data` with trailing whitespace dropped and the marker appended, so that a
/// surviving `startxref <offset>` is followed by exactly one end of line.
fn reterminate(data: &[u8]) -> Vec<u8> {
    let end = data
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |at| at + 1);
    let mut terminated = Vec::with_capacity(end + 7);
    terminated.extend_from_slice(&data[..end]);
    terminated.extend_from_slice(b"\n%%EOF\n");
    terminated
}

/// A document with an empty page tree and a catalog pointing at it.
fn empty_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Clone a single page object (and everything it references) from `source`
/// into `target`, appending it as the last page.
///
/// Inheritable attributes the page takes from its ancestors are copied onto
/// the clone, since the source page tree is not carried over.
fn clone_page_into(
    source: &Document,
    target: &mut Document,
    page_id: ObjectId,
    cloned: &mut HashMap<ObjectId, ObjectId>,
) -> Result<(), PdfCheckError> {
    let page_dict = source.get_dictionary(page_id).map_err(|err| {
        PdfCheckError::Pdf(format!("cannot read page object {:?}: {}", page_id, err))
    })?;

    let mut flattened = page_dict.clone();
    for key in INHERITABLE {
        if flattened.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_dict, key) {
            flattened.set(key.to_vec(), value.clone());
        }
    }

    let cloned_page = deep_clone_object(source, target, &Object::Dictionary(flattened), cloned)?;
    let cloned_id = target.add_object(cloned_page);

    let pages_id = target
        .catalog()
        .map_err(|err| PdfCheckError::Pdf(format!("no catalog: {}", err)))
        .and_then(|catalog| {
            catalog
                .get(b"Pages")
                .and_then(Object::as_reference)
                .map_err(|err| PdfCheckError::Pdf(format!("no /Pages: {}", err)))
        })?;

    // Add page reference to the /Kids array.
    if let Ok(Object::Dictionary(pages_dict)) = target.get_object_mut(pages_id) {
        if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
            kids.push(Object::Reference(cloned_id));
        }
        if let Ok(Object::Integer(count)) = pages_dict.get_mut(b"Count") {
            *count += 1;
        }
    }

    // Set the cloned page's /Parent to point at the target's /Pages node.
    if let Ok(Object::Dictionary(page_dict)) = target.get_object_mut(cloned_id) {
        page_dict.set("Parent", Object::Reference(pages_id));
    }

    Ok(())
}

/// Look `key` up on the ancestors of `page`.
fn inherited_attribute<'a>(
    source: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..32 {
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = source.get_dictionary(parent_id).ok()?;
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
    }
    None
}

/// Deep-clone a single lopdf Object, recursively resolving references.
///
/// /Parent is skipped (the caller patches it). Each source object is cloned
/// once; `cloned` maps source ids to target ids so shared and cyclic
/// references stay shared.
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
    cloned: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object, PdfCheckError> {
    match object {
        Object::Dictionary(dict) => Ok(Object::Dictionary(clone_dictionary(
            source, target, dict, cloned,
        )?)),
        Object::Array(arr) => {
            let mut new_arr = Vec::with_capacity(arr.len());
            for item in arr {
                new_arr.push(deep_clone_object(source, target, item, cloned)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Reference(ref_id) => {
            if let Some(existing) = cloned.get(ref_id) {
                return Ok(Object::Reference(*existing));
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    cloned.insert(*ref_id, new_id);
                    let copy = deep_clone_object(source, target, referenced, cloned)?;
                    target.objects.insert(new_id, copy);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Stream(stream) => {
            let dict = clone_dictionary(source, target, &stream.dict, cloned)?;
            Ok(Object::Stream(lopdf::Stream::new(dict, stream.content.clone())))
        }
        other => Ok(other.clone()),
    }
}

fn clone_dictionary(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
    cloned: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary, PdfCheckError> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), deep_clone_object(source, target, value, cloned)?);
    }
    Ok(new_dict)
}
