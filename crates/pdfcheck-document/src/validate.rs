// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format validity check — a document is usable when some page has
// extractable text or, failing that, some page embeds an image.

use std::path::Path;

use pdfcheck_core::error::Result;
use tracing::{debug, instrument};

use crate::pdf::reader::PdfReader;
use crate::pdf::resources::page_image_ids;

/// What made a document pass the format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usable {
    /// The given page (1-indexed) has non-blank text.
    Text { page: u32 },
    /// No page has text, but the given page embeds an image.
    Image { page: u32 },
}

/// Read-only structural check used before deciding whether to repair.
pub struct FormatValidator;

impl FormatValidator {
    /// `true` when the document has text or images. Any failure to open or
    /// inspect the document counts as invalid.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn is_valid(path: impl AsRef<Path>) -> bool {
        match Self::inspect(path) {
            Ok(usable) => {
                debug!(?usable, "format check finished");
                usable.is_some()
            }
            Err(err) => {
                debug!(%err, "format check failed, treating as invalid");
                false
            }
        }
    }

    /// Find the first reason the document is usable, if any.
    ///
    /// Text is searched on every page first (first hit wins); images are only
    /// considered when no page has text.
    pub fn inspect(path: impl AsRef<Path>) -> Result<Option<Usable>> {
        let reader = PdfReader::open(path)?;
        let pages = reader.page_ids();

        for page in 1..=pages.len() as u32 {
            if !reader.page_text(page)?.trim().is_empty() {
                return Ok(Some(Usable::Text { page }));
            }
        }

        let doc = reader.document();
        Ok(pages
            .iter()
            .position(|page_id| !page_image_ids(doc, *page_id).is_empty())
            .map(|index| Usable::Image {
                page: index as u32 + 1,
            }))
    }
}
