// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

use crate::types::{DeckLayout, OutputFormat, PagedMode, ScanFilter};

/// User defaults for scanning and conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output format used when neither the command line nor the output path
    /// names one.
    pub default_format: OutputFormat,
    /// Extension subset applied to folder scans.
    pub default_filter: ScanFilter,
    /// Embedding mode for paged documents.
    pub default_paged_mode: PagedMode,
    /// JPEG quality behind the "medium" preset.
    pub medium_quality: u8,
    /// JPEG quality behind the "high compression" preset.
    pub high_compression_quality: u8,
    /// Placement used for slide decks.
    pub default_layout: DeckLayout,
    /// Appended to the first image's stem when deriving an output name.
    pub output_suffix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::PagedDocument,
            default_filter: ScanFilter::All,
            default_paged_mode: PagedMode::Lossless,
            medium_quality: PagedMode::MEDIUM_QUALITY,
            high_compression_quality: PagedMode::HIGH_COMPRESSION_QUALITY,
            default_layout: DeckLayout::Blank,
            output_suffix: "_merged".into(),
        }
    }
}

impl AppConfig {
    /// Recompress mode for the "medium" preset.
    pub fn medium(&self) -> PagedMode {
        PagedMode::Recompress {
            quality: self.medium_quality,
        }
    }

    /// Recompress mode for the "high compression" preset.
    pub fn high_compression(&self) -> PagedMode {
        PagedMode::Recompress {
            quality: self.high_compression_quality,
        }
    }
}
