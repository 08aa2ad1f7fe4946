// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slide-deck export pipeline: one blank slide per image.

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::types::{DeckLayout, ExportRequest, ExportResult, ImageEntry, OutputFormat, ProgressEvent};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::package::{DeckPackage, MediaKind, SlideMedia, SlidePicture};
use crate::export::{Exporter, ProgressSink, title_for};
use crate::image::{ImageProcessor, probe_dimensions, sniff_format};
use crate::pdf::writer::write_output;

/// Turn encoded image bytes into media the deck can embed.
///
/// Formats presentations render natively are kept byte-for-byte; anything
/// else the catalog accepts is transcoded to PNG.
pub fn prepare_media(data: Vec<u8>) -> Result<SlideMedia> {
    let format = sniff_format(&data)
        .ok_or_else(|| BindwerkError::UnsupportedMedia("unrecognised image data".to_string()))?;
    if let Some(kind) = MediaKind::from_format(format) {
        return Ok(SlideMedia { kind, data });
    }

    debug!(?format, "Transcoding to PNG for the deck");
    let png = ImageProcessor::from_bytes(&data)
        .and_then(|image| image.to_png_bytes())
        .map_err(|err| BindwerkError::UnsupportedMedia(format!("cannot transcode {format:?}: {err}")))?;
    Ok(SlideMedia {
        kind: MediaKind::Png,
        data: png,
    })
}

/// Slide-deck export pipeline.
#[derive(Debug, Default)]
pub struct DeckExporter;

impl DeckExporter {
    pub fn new() -> Self {
        Self
    }

    /// Probe, read, and place one entry.
    fn prepare(
        deck: &DeckPackage,
        entry: &ImageEntry,
        layout: DeckLayout,
        source_bytes: &mut u64,
    ) -> Result<SlidePicture> {
        let (width, height) = probe_dimensions(&entry.path)?;
        let data = std::fs::read(&entry.path).map_err(|err| {
            BindwerkError::ImageError(format!("failed to read {}: {err}", entry.path.display()))
        })?;
        *source_bytes += data.len() as u64;

        let media = prepare_media(data)?;
        let placement = deck.canvas().place(layout, width, height);
        debug!(width, height, ?placement, "Placing picture");
        Ok(SlidePicture {
            name: entry.file_name(),
            media,
            rect: placement.to_emu(),
        })
    }
}

impl Exporter for DeckExporter {
    #[instrument(skip_all, fields(output = %request.output_path.display(), images = request.entries.len()))]
    fn export(&self, request: &ExportRequest, sink: &dyn ProgressSink) -> Result<ExportResult> {
        let layout = request.deck_layout();
        let total = request.entries.len();
        info!(?layout, "Creating slide deck");
        sink.on_log(&format!("Converting {total} images to PPTX"));

        let mut deck = DeckPackage::new(title_for(&request.output_path));
        let mut source_bytes = 0u64;
        let mut skipped = 0usize;

        for (index, entry) in request.entries.iter().enumerate() {
            let label = entry.file_name();
            sink.on_log(&format!("Adding slide ({}/{}): {}", index + 1, total, label));

            match Self::prepare(&deck, entry, layout, &mut source_bytes) {
                Ok(picture) => deck.add_slide(picture),
                Err(err) => {
                    skipped += 1;
                    warn!(path = %entry.path.display(), %err, "Skipping image");
                    sink.on_log(&format!("  warning: skipped {label}: {err}"));
                }
            }

            sink.on_progress(ProgressEvent { index, total, label });
        }

        if deck.slide_count() == 0 {
            return Err(BindwerkError::NothingWritten(total));
        }

        sink.on_log("Saving PPTX...");
        let written = deck.slide_count();
        let bytes = deck.to_bytes()?;
        write_output(&request.output_path, &bytes)?;
        let output_size_bytes = std::fs::metadata(&request.output_path)?.len();

        let result = ExportResult {
            output_path: request.output_path.clone(),
            output_format: OutputFormat::SlideDeck,
            output_size_bytes,
            items_written: written,
            items_skipped: skipped,
            source_bytes,
            completed_at: Utc::now(),
        };

        info!(slides = written, skipped, output_size_bytes, "Deck written");
        sink.on_log("PPTX complete");
        sink.on_log(&format!("  Slides: {written}"));
        sink.on_log(&format!("  File size: {:.2} MB", result.output_mb()));
        Ok(result)
    }
}
