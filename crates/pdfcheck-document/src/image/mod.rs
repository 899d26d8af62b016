// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — embedded image extraction and raw-scan recovery.

pub mod extract;
pub mod recover;

pub use extract::{EmbeddedImage, Extraction, ImageExtractor};
