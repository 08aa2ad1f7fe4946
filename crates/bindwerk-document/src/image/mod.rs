// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — header probing, RGB normalisation, and JPEG/PNG encoding.

pub mod probe;
pub mod processor;

pub use probe::{
    JpegHeader, PngStream, jpeg_header, png_stream, probe_dimensions, probe_dimensions_from_bytes, sniff_format,
};
pub use processor::ImageProcessor;
