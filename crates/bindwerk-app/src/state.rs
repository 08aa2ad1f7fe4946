// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// View state — what the front end may offer, derived from the catalog and the
// conversion status. Never stored; recomputed whenever either changes.

use bindwerk_core::types::{ConversionOutcome, ConversionStatus};
use bindwerk_document::ImageCatalog;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// A conversion can be requested.
    pub convert_enabled: bool,
    /// The current selection can be moved.
    pub move_enabled: bool,
    /// The current selection can be removed.
    pub remove_enabled: bool,
    /// e.g. "3 images, 4.20 MB".
    pub count_label: String,
    /// One-line summary of the conversion state.
    pub status_line: String,
}

impl ViewState {
    pub fn derive(
        catalog: &ImageCatalog,
        selection: &[usize],
        status: ConversionStatus,
        outcome: Option<&ConversionOutcome>,
    ) -> Self {
        let running = status == ConversionStatus::Running;
        let has_selection = selection.iter().any(|&index| index < catalog.len());

        let count = catalog.len();
        let count_label = format!(
            "{count} image{}, {:.2} MB",
            if count == 1 { "" } else { "s" },
            catalog.total_bytes() as f64 / BYTES_PER_MB
        );

        let status_line = match (status, outcome) {
            (ConversionStatus::Running, _) => "Converting...".to_string(),
            (_, Some(ConversionOutcome::Succeeded(result))) => {
                let mut line = format!(
                    "Done: {} written to {} ({:.2} MB",
                    result.items_written,
                    result.output_path.display(),
                    result.output_mb()
                );
                if result.items_skipped > 0 {
                    line.push_str(&format!(", {} skipped", result.items_skipped));
                }
                line.push(')');
                line
            }
            (_, Some(ConversionOutcome::Failed { cause, .. })) => format!("Failed: {cause}"),
            (ConversionStatus::Succeeded, None) => "Done".to_string(),
            (ConversionStatus::Failed, None) => "Failed".to_string(),
            (ConversionStatus::Idle, None) if count == 0 => "No images loaded".to_string(),
            (ConversionStatus::Idle, None) => "Ready".to_string(),
        };

        Self {
            convert_enabled: count > 0 && status == ConversionStatus::Idle,
            move_enabled: has_selection && !running,
            remove_enabled: has_selection && !running,
            count_label,
            status_line,
        }
    }
}
