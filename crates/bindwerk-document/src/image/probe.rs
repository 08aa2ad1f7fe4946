// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Header-level image inspection: dimensions, container format, and the JPEG
// frame header needed to pass JPEG data through to a PDF untouched.

use std::io::Cursor;
use std::path::Path;

use bindwerk_core::error::BindwerkError;
use image::{ImageFormat, ImageReader};

/// Read pixel dimensions from a file header without decoding pixel data.
pub fn probe_dimensions(path: impl AsRef<Path>) -> Result<(u32, u32), BindwerkError> {
    let path = path.as_ref();
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| {
            BindwerkError::ImageError(format!("failed to open {}: {}", path.display(), err))
        })?;
    reader.into_dimensions().map_err(|err| {
        BindwerkError::ImageError(format!(
            "failed to read dimensions of {}: {}",
            path.display(),
            err
        ))
    })
}

/// Read pixel dimensions from encoded bytes without decoding pixel data.
pub fn probe_dimensions_from_bytes(data: &[u8]) -> Result<(u32, u32), BindwerkError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|err| BindwerkError::ImageError(format!("failed to sniff image: {}", err)))?
        .into_dimensions()
        .map_err(|err| BindwerkError::ImageError(format!("failed to read dimensions: {}", err)))
}

/// Identify the container format from magic bytes.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok()
}

/// The parts of a JPEG frame header (SOFn segment) that matter for embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegHeader {
    pub width: u32,
    pub height: u32,
    /// 1 = grayscale, 3 = YCbCr/RGB, 4 = CMYK/YCCK.
    pub components: u8,
    pub precision: u8,
    /// SOF marker byte (0xC0 baseline, 0xC1 extended, 0xC2 progressive, ...).
    pub marker: u8,
}

impl JpegHeader {
    /// Whether a PDF reader can decode this stream with a plain `DCTDecode`
    /// filter and a `DeviceGray`/`DeviceRGB` colour space.
    pub fn is_pdf_passthrough(&self) -> bool {
        matches!(self.marker, 0xC0..=0xC2)
            && self.precision == 8
            && matches!(self.components, 1 | 3)
            && self.width > 0
            && self.height > 0
    }
}

/// Walk the JPEG marker segments up to the first frame header.
///
/// Returns `None` for anything that is not a well-formed JPEG up to its SOFn
/// segment.
pub fn jpeg_header(data: &[u8]) -> Option<JpegHeader> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos < data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        // Skip fill bytes.
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;

        // Standalone markers carry no length field.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        // End of image or start of scan before any frame header.
        if marker == 0xD9 || marker == 0xDA {
            return None;
        }

        let length = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
        if length < 2 {
            return None;
        }
        let segment = data.get(pos + 2..pos + length)?;

        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            if segment.len() < 6 {
                return None;
            }
            return Some(JpegHeader {
                precision: segment[0],
                height: u16::from_be_bytes([segment[1], segment[2]]) as u32,
                width: u16::from_be_bytes([segment[3], segment[4]]) as u32,
                components: segment[5],
                marker,
            });
        }

        pos += length;
    }
    None
}

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// A PNG's image header plus its concatenated `IDAT` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngStream {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    /// 0 gray, 2 RGB, 3 palette, 4 gray+alpha, 6 RGBA.
    pub color_type: u8,
    pub interlaced: bool,
    /// A `tRNS` chunk was present.
    pub has_transparency: bool,
    /// zlib stream of filtered scanlines, exactly as stored in the file.
    pub idat: Vec<u8>,
}

impl PngStream {
    /// Colour channels per pixel for gray and RGB sources.
    pub fn colors(&self) -> u8 {
        if self.color_type == 2 { 3 } else { 1 }
    }

    /// Whether the `IDAT` data can be embedded as a PDF `FlateDecode` stream
    /// with a PNG predictor, without decoding.
    pub fn is_pdf_passthrough(&self) -> bool {
        let depth_ok = match self.color_type {
            0 => matches!(self.bit_depth, 1 | 2 | 4 | 8 | 16),
            2 => matches!(self.bit_depth, 8 | 16),
            _ => false,
        };
        depth_ok && !self.interlaced && !self.has_transparency && self.width > 0 && self.height > 0
    }
}

/// Walk the PNG chunk list, collecting the header and all `IDAT` data.
///
/// Returns `None` for anything that is not a well-formed PNG up to `IEND`.
/// Chunk CRCs are not checked.
pub fn png_stream(data: &[u8]) -> Option<PngStream> {
    let rest = data.strip_prefix(PNG_SIGNATURE)?;

    let mut pos = 0;
    let mut header = None;
    let mut has_transparency = false;
    let mut idat = Vec::new();
    loop {
        let length = u32::from_be_bytes(rest.get(pos..pos + 4)?.try_into().ok()?) as usize;
        let kind = rest.get(pos + 4..pos + 8)?;
        let body = rest.get(pos + 8..(pos + 8).checked_add(length)?)?;
        match kind {
            b"IHDR" => {
                if body.len() != 13 || body[10] != 0 || body[11] != 0 {
                    return None;
                }
                header = Some((
                    u32::from_be_bytes(body[0..4].try_into().ok()?),
                    u32::from_be_bytes(body[4..8].try_into().ok()?),
                    body[8],
                    body[9],
                    body[12] != 0,
                ));
            }
            b"tRNS" => has_transparency = true,
            b"IDAT" => idat.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        // Length, type, body, CRC.
        pos += 12 + length;
    }

    let (width, height, bit_depth, color_type, interlaced) = header?;
    if idat.is_empty() {
        return None;
    }
    Some(PngStream {
        width,
        height,
        bit_depth,
        color_type,
        interlaced,
        has_transparency,
        idat,
    })
}
