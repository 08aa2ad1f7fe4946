// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, normalise to RGB, and re-encode images before they
// are embedded into a document. Operates on in-memory images using the `image`
// crate.

use bindwerk_core::error::BindwerkError;
use image::{ColorType, DynamicImage, ImageFormat};
use tracing::{debug, instrument};

/// Decoding and re-encoding for a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, enabling
/// method chaining.
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&std::fs::read("scan.png")?)?
///     .to_rgb()
///     .to_jpeg_bytes(60)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, BindwerkError> {
        let img = image::load_from_memory(data)
            .map_err(|err| BindwerkError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel layout of the decoded image.
    pub fn color(&self) -> ColorType {
        self.image.color()
    }

    /// Whether the decoded image carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Normalise to 8-bit, 3-channel RGB.
    ///
    /// Alpha is dropped, not composited against a background. CMYK sources are
    /// already RGB once decoded.
    #[instrument(skip(self))]
    pub fn to_rgb(self) -> Self {
        if self.image.color() == ColorType::Rgb8 {
            return self;
        }
        debug!(from = ?self.image.color(), "Normalising to RGB8");
        Self {
            image: DynamicImage::ImageRgb8(self.image.to_rgb8()),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, BindwerkError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    ///
    /// The encoder only accepts RGB or luma input, so the image is converted to
    /// RGB8 first.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, BindwerkError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| BindwerkError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, BindwerkError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| BindwerkError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
