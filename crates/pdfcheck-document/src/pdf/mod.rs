// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — opening, page copying, resource lookup, and rebuilding PDFs.

pub(crate) mod raw;
pub mod reader;
pub mod resources;
pub mod writer;

pub use reader::PdfReader;
pub use writer::PdfWriter;
