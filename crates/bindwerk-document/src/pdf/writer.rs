// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — build a one-page-per-image document with `lopdf` and write it
// out once every image has been attempted.
//
// Each page's MediaBox equals the image size in pixels (one point per pixel)
// and the image XObject is painted over the whole page.

use std::path::Path;

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::types::{ExportRequest, ExportResult, ImageEntry, OutputFormat, PagedMode, ProgressEvent};
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, instrument, warn};

use super::xobject::EmbeddedImage;
use crate::export::{Exporter, ProgressSink, title_for};

/// Name under which each page references its image.
const IMAGE_RESOURCE: &str = "Im0";

/// Incrementally assembles the page tree of a paged document.
pub struct PagedDocumentBuilder {
    doc: Document,
    /// Reserved id of the /Pages node; filled in by [`PagedDocumentBuilder::finish`].
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    title: String,
}

impl PagedDocumentBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            title: title.into(),
        }
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append a page sized to `image` and paint the image over all of it.
    pub fn add_image_page(&mut self, image: EmbeddedImage) -> Result<()> {
        let width = i64::from(image.width);
        let height = i64::from(image.height);

        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => image.color_space.pdf_name(),
            "BitsPerComponent" => i64::from(image.bits_per_component),
            "Filter" => image.filter.pdf_name(),
        };
        if let Some(predictor) = image.predictor {
            image_dict.set(
                "DecodeParms",
                dictionary! {
                    "Predictor" => 15i64,
                    "Colors" => i64::from(predictor.colors),
                    "BitsPerComponent" => i64::from(predictor.bits_per_component),
                    "Columns" => i64::from(predictor.columns),
                },
            );
        }
        if let Some(mask) = image.soft_mask {
            let mask_dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => i64::from(mask.bits_per_component),
                "Filter" => "FlateDecode",
            };
            let mask_id = self.doc.add_object(Stream::new(mask_dict, mask.data));
            image_dict.set("SMask", mask_id);
        }
        let image_id = self.doc.add_object(Stream::new(image_dict, image.data));

        // Scale the unit square to the full page.
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                        height.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|err| BindwerkError::PdfError(format!("content stream encoding failed: {err}")))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_RESOURCE => image_id,
                },
            },
        });
        self.page_ids.push(page_id);
        debug!(page = self.page_ids.len(), width, height, "Page added");
        Ok(())
    }

    /// Close the page tree and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => text_string(&self.title),
            "Producer" => Object::string_literal("Bindwerk"),
            "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|err| BindwerkError::PdfError(format!("failed to serialise PDF: {err}")))?;
        Ok(output)
    }
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(|unit| unit.to_be_bytes()));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Paged-document export pipeline.
#[derive(Debug, Default)]
pub struct PdfExporter;

impl PdfExporter {
    pub fn new() -> Self {
        Self
    }

    /// Read and prepare one entry, adding the bytes read to `source_bytes`.
    fn prepare(entry: &ImageEntry, mode: PagedMode, source_bytes: &mut u64) -> Result<EmbeddedImage> {
        let data = std::fs::read(&entry.path).map_err(|err| {
            BindwerkError::ImageError(format!("failed to read {}: {err}", entry.path.display()))
        })?;
        *source_bytes += data.len() as u64;
        EmbeddedImage::for_mode(&data, mode)
    }
}

impl Exporter for PdfExporter {
    #[instrument(skip_all, fields(output = %request.output_path.display(), images = request.entries.len()))]
    fn export(&self, request: &ExportRequest, sink: &dyn ProgressSink) -> Result<ExportResult> {
        let mode = request.paged_mode();
        let total = request.entries.len();
        info!(%mode, "Creating paged document");
        sink.on_log(&format!("Converting {total} images to PDF ({mode})"));

        let mut builder = PagedDocumentBuilder::new(title_for(&request.output_path));
        let mut source_bytes = 0u64;
        let mut skipped = 0usize;

        for (index, entry) in request.entries.iter().enumerate() {
            let label = entry.file_name();
            sink.on_log(&format!("Processing ({}/{}): {} [{}]", index + 1, total, label, mode));

            let added = Self::prepare(entry, mode, &mut source_bytes)
                .and_then(|image| builder.add_image_page(image));
            if let Err(err) = added {
                skipped += 1;
                warn!(path = %entry.path.display(), %err, "Skipping image");
                sink.on_log(&format!("  warning: skipped {label}: {err}"));
            }

            sink.on_progress(ProgressEvent { index, total, label });
        }

        if builder.page_count() == 0 {
            return Err(BindwerkError::NothingWritten(total));
        }

        sink.on_log("Saving PDF...");
        let written = builder.page_count();
        let bytes = builder.finish()?;
        write_output(&request.output_path, &bytes)?;
        let output_size_bytes = std::fs::metadata(&request.output_path)?.len();

        let result = ExportResult {
            output_path: request.output_path.clone(),
            output_format: OutputFormat::PagedDocument,
            output_size_bytes,
            items_written: written,
            items_skipped: skipped,
            source_bytes,
            completed_at: Utc::now(),
        };

        info!(
            pages = written,
            skipped,
            output_size_bytes,
            ratio = result.compression_ratio(),
            "PDF written"
        );
        sink.on_log("PDF complete");
        sink.on_log(&format!("  Source total: {:.2} MB", result.source_mb()));
        sink.on_log(&format!("  PDF size: {:.2} MB", result.output_mb()));
        sink.on_log(&format!("  Compression: {}", result.compression_ratio_display()));
        Ok(result)
    }
}

/// Write the finished document in one go.
pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::testing::RecordingSink;
    use crate::image::ImageProcessor;
    use bindwerk_core::types::ErrorClass;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn write_image(dir: &Path, name: &str, image: DynamicImage) -> ImageEntry {
        let path = dir.join(name);
        let processor = ImageProcessor::from_dynamic(image);
        let bytes = if name.ends_with(".jpg") {
            processor.to_jpeg_bytes(90).unwrap()
        } else {
            processor.to_png_bytes().unwrap()
        };
        std::fs::write(&path, &bytes).unwrap();
        ImageEntry::new(path, bytes.len() as u64)
    }

    fn rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 60, 90])))
    }

    fn image_stream<'a>(doc: &'a Document, page_id: ObjectId) -> &'a Stream {
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        doc.get_object(image_id).unwrap().as_stream().unwrap()
    }

    fn media_box(doc: &Document, page_id: ObjectId) -> Vec<i64> {
        let page = doc.get_dictionary(page_id).unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn pages_match_image_sizes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            write_image(dir.path(), "a.png", rgb(40, 30)),
            write_image(dir.path(), "b.jpg", rgb(16, 64)),
        ];
        let output = dir.path().join("out.pdf");
        let request = ExportRequest::paged(entries, &output, PagedMode::Lossless);

        let sink = RecordingSink::default();
        let result = PdfExporter::new().export(&request, &sink).unwrap();
        assert_eq!(result.items_written, 2);
        assert_eq!(result.items_skipped, 0);
        assert_eq!(result.output_size_bytes, std::fs::metadata(&output).unwrap().len());
        assert_eq!(sink.indices(), [0, 1]);

        let doc = Document::load(&output).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box(&doc, pages[0]), [0, 0, 40, 30]);
        assert_eq!(media_box(&doc, pages[1]), [0, 0, 16, 64]);
    }

    #[test]
    fn lossless_embeds_original_jpeg_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_image(dir.path(), "photo.jpg", rgb(20, 10));
        let original = std::fs::read(&entry.path).unwrap();
        let output = dir.path().join("out.pdf");

        PdfExporter::new()
            .export(
                &ExportRequest::paged(vec![entry], &output, PagedMode::Lossless),
                &RecordingSink::default(),
            )
            .unwrap();

        let doc = Document::load(&output).unwrap();
        let page = *doc.get_pages().get(&1).unwrap();
        let stream = image_stream(&doc, page);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.content, original);
    }

    #[test]
    fn recompress_rgba_embeds_rgb_jpeg_without_mask() {
        let dir = tempfile::tempdir().unwrap();
        let rgba = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 100]));
        let entry = write_image(dir.path(), "alpha.png", DynamicImage::ImageRgba8(rgba));
        let output = dir.path().join("out.pdf");

        PdfExporter::new()
            .export(
                &ExportRequest::paged(vec![entry], &output, PagedMode::medium()),
                &RecordingSink::default(),
            )
            .unwrap();

        let doc = Document::load(&output).unwrap();
        let page = *doc.get_pages().get(&1).unwrap();
        let stream = image_stream(&doc, page);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert!(stream.dict.get(b"SMask").is_err());
        let decoded = ImageProcessor::from_bytes(&stream.content).unwrap();
        assert!(!decoded.has_alpha());
    }

    #[test]
    fn lossless_rgba_png_carries_soft_mask() {
        let dir = tempfile::tempdir().unwrap();
        let rgba = RgbaImage::from_fn(4, 4, |x, _| Rgba([10, 20, 30, (x * 50) as u8]));
        let entry = write_image(dir.path(), "alpha.png", DynamicImage::ImageRgba8(rgba));
        let output = dir.path().join("out.pdf");

        PdfExporter::new()
            .export(
                &ExportRequest::paged(vec![entry], &output, PagedMode::Lossless),
                &RecordingSink::default(),
            )
            .unwrap();

        let doc = Document::load(&output).unwrap();
        let page = *doc.get_pages().get(&1).unwrap();
        let stream = image_stream(&doc, page);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
        assert!(stream.dict.get(b"SMask").unwrap().as_reference().is_ok());
    }

    #[test]
    fn lossless_png_keeps_idat_with_predictor() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_image(dir.path(), "flat.png", rgb(24, 12));
        let idat = crate::image::png_stream(&std::fs::read(&entry.path).unwrap()).unwrap().idat;
        let output = dir.path().join("out.pdf");

        PdfExporter::new()
            .export(
                &ExportRequest::paged(vec![entry], &output, PagedMode::Lossless),
                &RecordingSink::default(),
            )
            .unwrap();

        let doc = Document::load(&output).unwrap();
        let page = *doc.get_pages().get(&1).unwrap();
        let stream = image_stream(&doc, page);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
        let parms = stream.dict.get(b"DecodeParms").unwrap().as_dict().unwrap();
        assert_eq!(parms.get(b"Predictor").unwrap().as_i64().unwrap(), 15);
        assert_eq!(parms.get(b"Colors").unwrap().as_i64().unwrap(), 3);
        assert_eq!(parms.get(b"Columns").unwrap().as_i64().unwrap(), 24);
        assert_eq!(stream.content, idat);
    }

    #[test]
    fn recompress_accepts_quality_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_image(dir.path(), "a.png", rgb(10, 10));

        for quality in [1, 100] {
            let output = dir.path().join(format!("q{quality}.pdf"));
            let result = PdfExporter::new()
                .export(
                    &ExportRequest::paged(vec![entry.clone()], &output, PagedMode::Recompress { quality }),
                    &RecordingSink::default(),
                )
                .unwrap();
            assert_eq!(result.items_written, 1);

            let doc = Document::load(&output).unwrap();
            let page = *doc.get_pages().get(&1).unwrap();
            let stream = image_stream(&doc, page);
            assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
            assert_eq!(crate::image::jpeg_header(&stream.content).unwrap().components, 3);
        }
    }

    #[test]
    fn unreadable_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("b.png");
        std::fs::write(&broken, b"corrupt").unwrap();
        let entries = vec![
            write_image(dir.path(), "a.png", rgb(5, 5)),
            ImageEntry::new(broken, 7),
            write_image(dir.path(), "c.png", rgb(6, 6)),
        ];
        let output = dir.path().join("out.pdf");

        let sink = RecordingSink::default();
        let result = PdfExporter::new()
            .export(&ExportRequest::paged(entries, &output, PagedMode::Lossless), &sink)
            .unwrap();

        assert_eq!(result.items_written, 2);
        assert_eq!(result.items_skipped, 1);
        assert_eq!(sink.indices(), [0, 1, 2]);
        assert!(sink.logs.lock().unwrap().iter().any(|line| line.contains("skipped b.png")));
        assert_eq!(Document::load(&output).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn nothing_readable_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");
        let request = ExportRequest::paged(
            vec![ImageEntry::new(dir.path().join("missing.png"), 0)],
            &output,
            PagedMode::Lossless,
        );

        let err = PdfExporter::new().export(&request, &RecordingSink::default()).unwrap_err();
        assert!(matches!(err, BindwerkError::NothingWritten(1)));
        assert!(!output.exists());
    }

    #[test]
    fn unwritable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_image(dir.path(), "a.png", rgb(2, 2));
        let output = dir.path().join("no-such-dir").join("out.pdf");

        let err = PdfExporter::new()
            .export(
                &ExportRequest::paged(vec![entry], &output, PagedMode::Lossless),
                &RecordingSink::default(),
            )
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn non_ascii_title_is_utf16() {
        match text_string("Übersicht") {
            Object::String(bytes, StringFormat::Hexadecimal) => assert_eq!(&bytes[..2], &[0xFE, 0xFF]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
