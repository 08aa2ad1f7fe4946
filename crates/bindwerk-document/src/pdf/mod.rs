// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — image XObject preparation and the one-page-per-image writer.

pub mod writer;
pub mod xobject;

pub use writer::{PagedDocumentBuilder, PdfExporter};
pub use xobject::{EmbeddedImage, PngPredictor};
