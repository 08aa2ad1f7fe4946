// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObject preparation — turn an encoded source image into the sample
// stream, filter, and colour space a PDF page will reference.

use std::io::Write;

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::types::PagedMode;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ColorType, DynamicImage};
use tracing::debug;

use crate::image::{ImageProcessor, jpeg_header, png_stream};

/// PDF stream filter applied to the sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    /// JPEG data, stored as-is.
    Dct,
    /// zlib-compressed raw samples.
    Flate,
}

impl StreamFilter {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Dct => "DCTDecode",
            Self::Flate => "FlateDecode",
        }
    }
}

/// Device colour space of the sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
        }
    }
}

/// Alpha channel carried as a `/SMask` image (always gray, always Flate).
#[derive(Debug, Clone)]
pub struct SoftMask {
    pub bits_per_component: u8,
    pub data: Vec<u8>,
}

/// `/DecodeParms` for Flate data that still carries PNG row filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngPredictor {
    pub colors: u8,
    pub bits_per_component: u8,
    pub columns: u32,
}

/// An image ready to be written as an `/XObject /Image` stream.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub bits_per_component: u8,
    pub filter: StreamFilter,
    pub predictor: Option<PngPredictor>,
    pub data: Vec<u8>,
    pub soft_mask: Option<SoftMask>,
}

impl EmbeddedImage {
    /// Prepare `source` according to the paged-document mode.
    pub fn for_mode(source: &[u8], mode: PagedMode) -> Result<Self> {
        match mode {
            PagedMode::Lossless => Self::lossless(source),
            PagedMode::Recompress { quality } => Self::recompressed(source, quality),
        }
    }

    /// Embed the source without losing information.
    ///
    /// Baseline and progressive gray/RGB JPEGs are stored byte-for-byte, and so
    /// is the compressed `IDAT` data of non-interlaced gray/RGB PNGs without
    /// transparency. Every other source is stored as its exact decoded samples,
    /// with alpha moved to a soft mask unless the image is fully opaque.
    pub fn lossless(source: &[u8]) -> Result<Self> {
        if let Some(header) = jpeg_header(source) {
            if header.is_pdf_passthrough() {
                debug!(
                    width = header.width,
                    height = header.height,
                    components = header.components,
                    "Passing JPEG through unchanged"
                );
                let color_space = if header.components == 1 {
                    ColorSpace::Gray
                } else {
                    ColorSpace::Rgb
                };
                return Ok(Self {
                    width: header.width,
                    height: header.height,
                    color_space,
                    bits_per_component: 8,
                    filter: StreamFilter::Dct,
                    predictor: None,
                    data: source.to_vec(),
                    soft_mask: None,
                });
            }
        }

        if let Some(png) = png_stream(source) {
            if png.is_pdf_passthrough() {
                debug!(
                    width = png.width,
                    height = png.height,
                    bit_depth = png.bit_depth,
                    idat_len = png.idat.len(),
                    "Passing PNG data through unchanged"
                );
                let color_space = if png.colors() == 1 {
                    ColorSpace::Gray
                } else {
                    ColorSpace::Rgb
                };
                return Ok(Self {
                    width: png.width,
                    height: png.height,
                    color_space,
                    bits_per_component: png.bit_depth,
                    filter: StreamFilter::Flate,
                    predictor: Some(PngPredictor {
                        colors: png.colors(),
                        bits_per_component: png.bit_depth,
                        columns: png.width,
                    }),
                    data: png.idat,
                    soft_mask: None,
                });
            }
        }

        let image = ImageProcessor::from_bytes(source)?.into_dynamic();
        Self::from_samples(&image)
    }

    /// Normalise to RGB (alpha discarded) and re-encode as JPEG at `quality`.
    pub fn recompressed(source: &[u8], quality: u8) -> Result<Self> {
        let processor = ImageProcessor::from_bytes(source)?.to_rgb();
        let (width, height) = (processor.width(), processor.height());
        let data = processor.to_jpeg_bytes(quality)?;
        debug!(
            width,
            height,
            quality,
            source_len = source.len(),
            jpeg_len = data.len(),
            "Recompressed image"
        );
        Ok(Self {
            width,
            height,
            color_space: ColorSpace::Rgb,
            bits_per_component: 8,
            filter: StreamFilter::Dct,
            predictor: None,
            data,
            soft_mask: None,
        })
    }

    /// Store decoded samples losslessly.
    fn from_samples(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        let (color_space, bits, samples, alpha) = match image.color() {
            ColorType::L8 => (ColorSpace::Gray, 8, image.to_luma8().into_raw(), None),
            ColorType::La8 => {
                let (gray, alpha) = split_alpha(&image.to_luma_alpha8().into_raw(), 2);
                (ColorSpace::Gray, 8, gray, opaque_or(alpha, u8::MAX).map(|a| (8, a)))
            }
            ColorType::Rgb8 => (ColorSpace::Rgb, 8, image.to_rgb8().into_raw(), None),
            ColorType::Rgba8 => {
                let (rgb, alpha) = split_alpha(&image.to_rgba8().into_raw(), 4);
                (ColorSpace::Rgb, 8, rgb, opaque_or(alpha, u8::MAX).map(|a| (8, a)))
            }
            ColorType::L16 => (ColorSpace::Gray, 16, be_bytes(&image.to_luma16().into_raw()), None),
            ColorType::La16 => {
                let (gray, alpha) = split_alpha(&image.to_luma_alpha16().into_raw(), 2);
                let mask = opaque_or(alpha, u16::MAX).map(|a| (16, be_bytes(&a)));
                (ColorSpace::Gray, 16, be_bytes(&gray), mask)
            }
            ColorType::Rgb16 => (ColorSpace::Rgb, 16, be_bytes(&image.to_rgb16().into_raw()), None),
            ColorType::Rgba16 => {
                let (rgb, alpha) = split_alpha(&image.to_rgba16().into_raw(), 4);
                let mask = opaque_or(alpha, u16::MAX).map(|a| (16, be_bytes(&a)));
                (ColorSpace::Rgb, 16, be_bytes(&rgb), mask)
            }
            // Float and future layouts have no PDF sample equivalent.
            other if other.has_alpha() => {
                let (rgb, alpha) = split_alpha(&image.to_rgba8().into_raw(), 4);
                (ColorSpace::Rgb, 8, rgb, opaque_or(alpha, u8::MAX).map(|a| (8, a)))
            }
            _ => (ColorSpace::Rgb, 8, image.to_rgb8().into_raw(), None),
        };

        let soft_mask = match alpha {
            Some((bits_per_component, data)) => Some(SoftMask {
                bits_per_component,
                data: deflate(&data)?,
            }),
            None => None,
        };

        debug!(
            width,
            height,
            bits,
            has_mask = soft_mask.is_some(),
            "Embedding decoded samples"
        );

        Ok(Self {
            width,
            height,
            color_space,
            bits_per_component: bits,
            filter: StreamFilter::Flate,
            predictor: None,
            data: deflate(&samples)?,
            soft_mask,
        })
    }
}

/// Split interleaved samples into colour samples and the trailing alpha sample.
fn split_alpha<T: Copy>(samples: &[T], channels: usize) -> (Vec<T>, Vec<T>) {
    let color_channels = channels - 1;
    let pixels = samples.len() / channels;
    let mut color = Vec::with_capacity(pixels * color_channels);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in samples.chunks_exact(channels) {
        color.extend_from_slice(&pixel[..color_channels]);
        alpha.push(pixel[color_channels]);
    }
    (color, alpha)
}

/// `None` when every alpha sample is fully opaque.
fn opaque_or<T: Copy + PartialEq>(alpha: Vec<T>, opaque: T) -> Option<Vec<T>> {
    if alpha.iter().all(|&a| a == opaque) {
        None
    } else {
        Some(alpha)
    }
}

/// PDF stores 16-bit samples big-endian.
fn be_bytes(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder
        .finish()
        .map_err(|err| BindwerkError::PdfError(format!("sample compression failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn png_of(image: DynamicImage) -> Vec<u8> {
        ImageProcessor::from_dynamic(image).to_png_bytes().unwrap()
    }

    fn translucent_rgba() -> RgbaImage {
        RgbaImage::from_fn(5, 4, |x, y| Rgba([x as u8 * 40, y as u8 * 50, 7, (x * 60) as u8]))
    }

    #[test]
    fn lossless_jpeg_is_byte_identical() {
        let jpeg = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            12,
            7,
            Rgb([90, 10, 200]),
        )))
        .to_jpeg_bytes(85)
        .unwrap();

        let embedded = EmbeddedImage::lossless(&jpeg).unwrap();
        assert_eq!(embedded.filter, StreamFilter::Dct);
        assert_eq!(embedded.color_space, ColorSpace::Rgb);
        assert_eq!((embedded.width, embedded.height), (12, 7));
        assert_eq!(embedded.data, jpeg);
    }

    #[test]
    fn lossless_rgba_keeps_exact_samples_and_alpha() {
        let rgba = translucent_rgba();
        let embedded = EmbeddedImage::lossless(&png_of(DynamicImage::ImageRgba8(rgba.clone()))).unwrap();

        assert_eq!(embedded.filter, StreamFilter::Flate);
        assert_eq!(embedded.color_space, ColorSpace::Rgb);
        let (rgb, alpha) = split_alpha(rgba.as_raw(), 4);
        assert_eq!(inflate(&embedded.data), rgb);

        let mask = embedded.soft_mask.expect("translucent image needs a soft mask");
        assert_eq!(mask.bits_per_component, 8);
        assert_eq!(inflate(&mask.data), alpha);
    }

    #[test]
    fn lossless_opaque_rgba_has_no_mask() {
        let opaque = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        let embedded = EmbeddedImage::lossless(&png_of(DynamicImage::ImageRgba8(opaque))).unwrap();
        assert!(embedded.soft_mask.is_none());
    }

    #[test]
    fn lossless_rgb_png_embeds_original_idat() {
        let rgb = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 200]));
        let png = png_of(DynamicImage::ImageRgb8(rgb.clone()));
        let idat = png_stream(&png).unwrap().idat;

        let embedded = EmbeddedImage::lossless(&png).unwrap();
        assert_eq!(embedded.filter, StreamFilter::Flate);
        assert_eq!(embedded.color_space, ColorSpace::Rgb);
        assert_eq!(embedded.bits_per_component, 8);
        assert_eq!(
            embedded.predictor,
            Some(PngPredictor {
                colors: 3,
                bits_per_component: 8,
                columns: 64,
            })
        );
        assert_eq!(embedded.data, idat);
        assert!(embedded.soft_mask.is_none());

        // One filter-type byte ahead of every scanline.
        let rows = inflate(&embedded.data);
        assert_eq!(rows.len(), 48 * (1 + 64 * 3));
    }

    #[test]
    fn lossless_gray_png_stays_gray() {
        let gray = GrayImage::from_pixel(4, 2, Luma([77]));
        let png = png_of(DynamicImage::ImageLuma8(gray));
        let embedded = EmbeddedImage::lossless(&png).unwrap();
        assert_eq!(embedded.color_space, ColorSpace::Gray);
        assert_eq!(embedded.predictor.map(|p| p.colors), Some(1));
        assert_eq!(embedded.data, png_stream(&png).unwrap().idat);
    }

    #[test]
    fn lossless_gray_from_other_containers_stores_samples() {
        let gray = GrayImage::from_pixel(4, 2, Luma([77]));
        let mut tiff = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut std::io::Cursor::new(&mut tiff), image::ImageFormat::Tiff)
            .unwrap();

        let embedded = EmbeddedImage::lossless(&tiff).unwrap();
        assert_eq!(embedded.color_space, ColorSpace::Gray);
        assert!(embedded.predictor.is_none());
        assert_eq!(inflate(&embedded.data), vec![77; 8]);
    }

    #[test]
    fn recompress_rgba_has_no_alpha() {
        let source = png_of(DynamicImage::ImageRgba8(translucent_rgba()));
        let embedded = EmbeddedImage::recompressed(&source, 30).unwrap();

        assert_eq!(embedded.filter, StreamFilter::Dct);
        assert_eq!(embedded.color_space, ColorSpace::Rgb);
        assert!(embedded.soft_mask.is_none());
        let header = jpeg_header(&embedded.data).unwrap();
        assert_eq!(header.components, 3);
        assert_eq!((header.width, header.height), (5, 4));
    }

    /// 8x8 baseline CMYK JPEG: one flat block per channel, Adobe marker with
    /// no colour transform, single-code Huffman tables.
    fn cmyk_jpeg() -> Vec<u8> {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
        jpeg.extend_from_slice(b"Adobe");
        jpeg.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
        jpeg.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
        jpeg.extend_from_slice(&[1; 64]);
        jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x14, 8, 0x00, 0x08, 0x00, 0x08, 4]);
        for id in 1..=4 {
            jpeg.extend_from_slice(&[id, 0x11, 0x00]);
        }
        for class in [0x00, 0x10] {
            jpeg.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, class, 1]);
            jpeg.extend_from_slice(&[0; 15]);
            jpeg.push(0x00);
        }
        jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x0E, 4]);
        for id in 1..=4 {
            jpeg.extend_from_slice(&[id, 0x00]);
        }
        jpeg.extend_from_slice(&[0x00, 0x3F, 0x00]);
        // DC difference 0 and end-of-block for each of the four blocks.
        jpeg.push(0x00);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    #[test]
    fn recompress_cmyk_jpeg_becomes_rgb_jpeg() {
        let source = cmyk_jpeg();
        let header = jpeg_header(&source).unwrap();
        assert_eq!(header.components, 4);
        assert!(!header.is_pdf_passthrough());

        let embedded = EmbeddedImage::recompressed(&source, 60).unwrap();
        assert_eq!(embedded.filter, StreamFilter::Dct);
        assert_eq!(embedded.color_space, ColorSpace::Rgb);
        let out = jpeg_header(&embedded.data).unwrap();
        assert_eq!(out.components, 3);
        assert_eq!((out.width, out.height), (8, 8));
    }

    #[test]
    fn undecodable_source_is_an_item_error() {
        let err = EmbeddedImage::lossless(b"definitely not pixels").unwrap_err();
        assert_eq!(err.class(), bindwerk_core::types::ErrorClass::Item);
    }
}
