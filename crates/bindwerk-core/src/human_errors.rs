// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the failure dialog.
//
// Every technical error is mapped to plain English with a clear suggestion.

use crate::error::BindwerkError;
use crate::types::ErrorClass;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user must change something before trying again.
    ActionRequired,
    /// Retrying as-is will not help.
    Permanent,
    /// Worth another attempt.
    Transient,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level (drives icon/colour in the front end).
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            severity,
        }
    }
}

/// Convert a `BindwerkError` into a `HumanError`.
pub fn humanize_error(err: &BindwerkError) -> HumanError {
    match err {
        BindwerkError::EmptyCatalog => HumanError::new(
            "There are no images to convert.",
            "Choose a folder that contains images, or change the format filter.",
            Severity::ActionRequired,
        ),
        BindwerkError::MissingOutputPath => HumanError::new(
            "No output file was chosen.",
            "Pick where the merged document should be saved.",
            Severity::ActionRequired,
        ),
        BindwerkError::InvalidOptions(detail) => HumanError::new(
            "The conversion settings are not valid.",
            format!("Check the quality and layout settings. ({detail})"),
            Severity::ActionRequired,
        ),
        BindwerkError::ConversionInProgress => HumanError::new(
            "A conversion is already running.",
            "Wait for it to finish before starting another one.",
            Severity::Transient,
        ),
        BindwerkError::NoRuntime => HumanError::new(
            "The converter could not start its background worker.",
            "Restart the application and try again.",
            Severity::Transient,
        ),
        BindwerkError::ImageError(_) | BindwerkError::UnsupportedMedia(_) => HumanError::new(
            "One of the images could not be used.",
            "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.",
            Severity::Permanent,
        ),
        BindwerkError::NothingWritten(count) => HumanError::new(
            "None of the images could be converted.",
            format!("All {count} images were unreadable. Check that the files are real images."),
            Severity::Permanent,
        ),
        BindwerkError::PdfError(_) | BindwerkError::DeckError(_) => HumanError::new(
            "The document could not be built.",
            "Try again with fewer images, or with the lossless setting.",
            Severity::Transient,
        ),
        BindwerkError::Worker(_) => HumanError::new(
            "The conversion stopped unexpectedly.",
            "Try again. If this keeps happening, please report it.",
            Severity::Transient,
        ),
        BindwerkError::Config(detail) => HumanError::new(
            "The settings file could not be read.",
            format!("Fix or delete the settings file. ({detail})"),
            Severity::ActionRequired,
        ),
        BindwerkError::Serialization(_) => HumanError::new(
            "The settings file is not valid.",
            "Fix or delete the settings file.",
            Severity::ActionRequired,
        ),
        BindwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "The output folder couldn't be found.",
                "It may have been moved or deleted. Choose the output location again.",
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "There is no permission to save there.",
                "Choose a different output folder.",
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem writing the output file.",
                "Try again. If this keeps happening, the disk may be full.",
                Severity::Transient,
            ),
        },
    }
}

/// Human-readable form of a failure that only survived as text and a class,
/// as carried by a finished run's outcome.
pub fn humanize_failure(cause: &str, class: ErrorClass) -> HumanError {
    match class {
        ErrorClass::Validation => HumanError::new(
            "The conversion could not start.",
            format!("Check the folder and settings. ({cause})"),
            Severity::ActionRequired,
        ),
        ErrorClass::Item => HumanError::new(
            "One of the images could not be used.",
            format!("Try saving it as a JPEG or PNG first. ({cause})"),
            Severity::Permanent,
        ),
        ErrorClass::Fatal => HumanError::new(
            "The conversion failed.",
            format!("Nothing was saved. ({cause})"),
            Severity::Transient,
        ),
    }
}
