// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Exporter seam shared by the PDF and PPTX pipelines.
//
// An exporter walks the request entries in order, reports one progress event
// per entry (written or skipped), and writes the output file once at the end.

use std::path::Path;

use bindwerk_core::error::Result;
use bindwerk_core::types::{ExportRequest, ExportResult, OutputFormat, ProgressEvent};

use crate::deck::DeckExporter;
use crate::pdf::PdfExporter;

/// Receives events from an export pipeline.
///
/// Implementations must be `Send + Sync` because exports run on a blocking
/// worker thread. Both methods default to no-ops.
pub trait ProgressSink: Send + Sync {
    /// Called after each entry is attempted, whether it was written or skipped.
    fn on_progress(&self, event: ProgressEvent) {
        let _ = event;
    }

    /// A human-readable log line (per-item diagnostics, final summary).
    fn on_log(&self, message: &str) {
        let _ = message;
    }
}

/// One export pipeline.
pub trait Exporter: Send + Sync {
    /// Convert every entry of `request` into one output document.
    ///
    /// Per-item failures are reported through `sink` and counted in
    /// [`ExportResult::items_skipped`]; only failures that prevent the document
    /// from being written are returned as errors.
    fn export(&self, request: &ExportRequest, sink: &dyn ProgressSink) -> Result<ExportResult>;
}

/// Pick the pipeline for an output format.
pub fn exporter_for(format: OutputFormat) -> Box<dyn Exporter> {
    match format {
        OutputFormat::PagedDocument => Box::new(PdfExporter::new()),
        OutputFormat::SlideDeck => Box::new(DeckExporter::new()),
    }
}

/// Run the exporter matching `request.output_format`.
pub fn run_export(request: &ExportRequest, sink: &dyn ProgressSink) -> Result<ExportResult> {
    request.validate()?;
    exporter_for(request.output_format).export(request, sink)
}

/// Output file stem used as document title metadata.
pub(crate) fn title_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Bindwerk".to_string())
}
