// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfcheck-verify — The verification pipeline. Checks a document, repairs it
// in place when it is unusable, and scans whole directories. This crate ties
// the document primitives in `pdfcheck-document` to the result types defined
// in `pdfcheck-core`.

pub mod batch;
pub mod normalize;
pub mod verifier;

pub use batch::scan_directory;
pub use normalize::{Normalized, Normalizer, Route};
pub use verifier::Verifier;
