// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bindwerk.

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all Bindwerk operations.
#[derive(Debug, Error)]
pub enum BindwerkError {
    // -- Validation (rejected before a run starts) --
    #[error("there are no images to convert")]
    EmptyCatalog,

    #[error("no output path set")]
    MissingOutputPath,

    #[error("invalid export options: {0}")]
    InvalidOptions(String),

    #[error("a conversion is already running")]
    ConversionInProgress,

    #[error("no async runtime available to run the conversion")]
    NoRuntime,

    // -- Per-item errors (skipped, never abort a run) --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),

    // -- Fatal errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("slide deck operation failed: {0}")]
    DeckError(String),

    #[error("none of the {0} images could be written")]
    NothingWritten(usize),

    #[error("conversion worker failed: {0}")]
    Worker(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BindwerkError {
    /// Where this error sits in the validation / item / fatal taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::EmptyCatalog
            | Self::MissingOutputPath
            | Self::InvalidOptions(_)
            | Self::ConversionInProgress
            | Self::NoRuntime => ErrorClass::Validation,
            Self::ImageError(_) | Self::UnsupportedMedia(_) => ErrorClass::Item,
            Self::PdfError(_)
            | Self::DeckError(_)
            | Self::NothingWritten(_)
            | Self::Worker(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorClass::Fatal,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BindwerkError>;
