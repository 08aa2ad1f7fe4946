// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slide-deck (PPTX) export.

pub mod layout;
pub mod package;
pub mod writer;

pub use layout::{Placement, SlideCanvas};
pub use package::{DeckPackage, MediaKind};
pub use writer::DeckExporter;
