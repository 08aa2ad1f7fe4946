// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bindwerk image merger.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BindwerkError, Result};

/// File extensions (lower-case, without the dot) accepted by a catalog scan.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp", "ico", "ppm",
];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Unique identifier for one conversion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One image discovered by a catalog scan.
///
/// Identity is the absolute path. Dimensions are read from the file header on
/// a best-effort basis and are `None` when the header cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
}

impl ImageEntry {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            pixel_width: None,
            pixel_height: None,
        }
    }

    /// Attach pixel dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.pixel_width = Some(width);
        self.pixel_height = Some(height);
        self
    }

    /// Both dimensions, if known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pixel_width.zip(self.pixel_height)
    }

    /// Final path component, lossily converted for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// List line shown to the user, e.g. `"  1. scan.png (0.25 MB)  [800x600]"`.
    ///
    /// `index` is 0-based; the label numbers entries from 1.
    pub fn display_label(&self, index: usize) -> String {
        let size_mb = self.size_bytes as f64 / BYTES_PER_MB;
        let dims = match self.dimensions() {
            Some((w, h)) => format!("  [{w}x{h}]"),
            None => String::new(),
        };
        format!("{:3}. {} ({:.2} MB){}", index + 1, self.file_name(), size_mb, dims)
    }
}

/// Named extension subsets offered when scanning a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanFilter {
    #[default]
    All,
    PngJpg,
    Tif,
    Bmp,
}

impl ScanFilter {
    /// Extensions this filter admits.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::All => SUPPORTED_EXTENSIONS,
            Self::PngJpg => &["jpg", "jpeg", "png"],
            Self::Tif => &["tif", "tiff"],
            Self::Bmp => &["bmp"],
        }
    }

    /// Case-insensitive extension check.
    pub fn allows(&self, extension: &str) -> bool {
        let lower = extension.to_ascii_lowercase();
        self.extensions().contains(&lower.as_str())
    }
}

/// Output document family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// One page per image (PDF).
    #[default]
    PagedDocument,
    /// One slide per image (PPTX).
    SlideDeck,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::PagedDocument => "pdf",
            Self::SlideDeck => "pptx",
        }
    }

    /// Infer the format from an output file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::PagedDocument),
            "pptx" => Some(Self::SlideDeck),
            _ => None,
        }
    }

    /// Infer the format from an output path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// How images are embedded into a paged document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PagedMode {
    /// Original image data, unmodified.
    #[default]
    Lossless,
    /// Normalised to RGB and re-encoded as JPEG at `quality` (1..=100).
    Recompress { quality: u8 },
}

impl PagedMode {
    /// Preset used for "medium quality".
    pub const MEDIUM_QUALITY: u8 = 60;
    /// Preset used for "high compression".
    pub const HIGH_COMPRESSION_QUALITY: u8 = 30;

    pub fn medium() -> Self {
        Self::Recompress {
            quality: Self::MEDIUM_QUALITY,
        }
    }

    pub fn high_compression() -> Self {
        Self::Recompress {
            quality: Self::HIGH_COMPRESSION_QUALITY,
        }
    }

    /// Reject qualities outside 1..=100.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Lossless => Ok(()),
            Self::Recompress { quality } if (1..=100).contains(quality) => Ok(()),
            Self::Recompress { quality } => Err(BindwerkError::InvalidOptions(format!(
                "recompression quality must be between 1 and 100, got {quality}"
            ))),
        }
    }
}

impl std::fmt::Display for PagedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lossless => write!(f, "lossless"),
            Self::Recompress { quality } => write!(f, "recompress q{quality}"),
        }
    }
}

/// Image placement on a slide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckLayout {
    /// Native size at a fixed half-inch offset from the top-left corner.
    #[default]
    Blank,
    /// Native size, centred on the slide.
    Centered,
    /// Uniformly scaled to the largest size that fits, then centred.
    FullBleedFit,
}

/// Options that only apply to paged-document exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedOptions {
    pub mode: PagedMode,
}

/// Options that only apply to slide-deck exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckOptions {
    pub layout: DeckLayout,
}

/// A complete conversion request. Immutable once handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub entries: Vec<ImageEntry>,
    pub output_format: OutputFormat,
    pub output_path: PathBuf,
    pub paged_options: Option<PagedOptions>,
    pub deck_options: Option<DeckOptions>,
}

impl ExportRequest {
    /// Request a paged document.
    pub fn paged(entries: Vec<ImageEntry>, output_path: impl Into<PathBuf>, mode: PagedMode) -> Self {
        Self {
            entries,
            output_format: OutputFormat::PagedDocument,
            output_path: output_path.into(),
            paged_options: Some(PagedOptions { mode }),
            deck_options: None,
        }
    }

    /// Request a slide deck.
    pub fn deck(entries: Vec<ImageEntry>, output_path: impl Into<PathBuf>, layout: DeckLayout) -> Self {
        Self {
            entries,
            output_format: OutputFormat::SlideDeck,
            output_path: output_path.into(),
            paged_options: None,
            deck_options: Some(DeckOptions { layout }),
        }
    }

    /// Paged mode, defaulting to lossless.
    pub fn paged_mode(&self) -> PagedMode {
        self.paged_options.unwrap_or_default().mode
    }

    /// Deck layout, defaulting to blank.
    pub fn deck_layout(&self) -> DeckLayout {
        self.deck_options.unwrap_or_default().layout
    }

    /// Checks performed before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(BindwerkError::EmptyCatalog);
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(BindwerkError::MissingOutputPath);
        }
        self.paged_mode().validate()
    }
}

/// Emitted once per processed entry, success or skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0-based position in the request.
    pub index: usize,
    pub total: usize,
    /// File name of the processed entry.
    pub label: String,
}

/// Summary of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub output_path: PathBuf,
    pub output_format: OutputFormat,
    pub output_size_bytes: u64,
    pub items_written: usize,
    pub items_skipped: usize,
    /// Total bytes of every source image that was read.
    pub source_bytes: u64,
    pub completed_at: DateTime<Utc>,
}

impl ExportResult {
    /// `1 - output / source`, or `0.0` when no source bytes were read.
    ///
    /// Negative when the output is larger than its sources.
    pub fn compression_ratio(&self) -> f64 {
        if self.source_bytes == 0 {
            return 0.0;
        }
        1.0 - self.output_size_bytes as f64 / self.source_bytes as f64
    }

    /// Ratio as a percentage, clamped to [-100 %, 100 %].
    pub fn compression_ratio_display(&self) -> String {
        let percent = (self.compression_ratio() * 100.0).clamp(-100.0, 100.0);
        format!("{percent:.1}%")
    }

    pub fn source_mb(&self) -> f64 {
        self.source_bytes as f64 / BYTES_PER_MB
    }

    pub fn output_mb(&self) -> f64 {
        self.output_size_bytes as f64 / BYTES_PER_MB
    }
}

/// Coarse error taxonomy used to decide whether a failure aborts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Rejected before any work started (empty catalog, no output path).
    Validation,
    /// A single image failed; it is skipped and the run continues.
    Item,
    /// The run cannot finish (output write failed, nothing to write).
    Fatal,
}

/// Lifecycle states of the conversion orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl ConversionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Terminal result of one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversionOutcome {
    Succeeded(ExportResult),
    Failed { cause: String, class: ErrorClass },
}

impl ConversionOutcome {
    pub fn failed(err: &BindwerkError) -> Self {
        Self::Failed {
            cause: err.to_string(),
            class: err.class(),
        }
    }

    pub fn status(&self) -> ConversionStatus {
        match self {
            Self::Succeeded(_) => ConversionStatus::Succeeded,
            Self::Failed { .. } => ConversionStatus::Failed,
        }
    }
}

/// Messages the core sends to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreEvent {
    CatalogUpdated(Vec<ImageEntry>),
    Progress(ProgressEvent),
    Log(String),
    Finished(ConversionOutcome),
}
