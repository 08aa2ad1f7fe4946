// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindwerk-document — Image catalog and document export for Bindwerk.
//
// Builds an ordered catalog of images from a folder, merges it into one PDF
// (one page per image) or one PPTX deck (one slide per image), and runs the
// export on a background worker that reports progress as `CoreEvent`s.

pub mod catalog;
pub mod convert;
pub mod deck;
pub mod export;
pub mod image;
pub mod pdf;

// Re-export the primary types so callers can use `bindwerk_document::ImageCatalog` etc.
pub use catalog::{ImageCatalog, ScanReport};
pub use convert::{ChannelSink, ConversionOrchestrator, RunHandle};
pub use deck::DeckExporter;
pub use export::{Exporter, ProgressSink, exporter_for, run_export};
pub use crate::image::processor::ImageProcessor;
pub use pdf::{PagedDocumentBuilder, PdfExporter};
