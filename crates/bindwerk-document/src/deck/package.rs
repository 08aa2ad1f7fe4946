// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PresentationML package — the zip container and XML parts of a .pptx file.
//
// The package holds one slide master, one blank slide layout, one theme, and
// one slide per picture. Each slide carries a single `p:pic` referencing its
// media part.

use std::collections::BTreeSet;
use std::io::{Cursor, Seek, Write};

use bindwerk_core::error::{BindwerkError, Result};
use chrono::{SecondsFormat, Utc};
use image::ImageFormat;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::layout::{EmuRect, SlideCanvas};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOC: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE: &str = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_PRES_PROPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
const REL_VIEW_PROPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps";
const REL_TABLE_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CT_PRESENTATION: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_SLIDE_MASTER: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_PRES_PROPS: &str = "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml";
const CT_VIEW_PROPS: &str = "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml";
const CT_TABLE_STYLES: &str = "application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_EXTENDED: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

/// First slide id PowerPoint accepts in `p:sldIdLst`.
const FIRST_SLIDE_ID: usize = 256;
/// Relationship id of the first slide in `presentation.xml.rels`; rId1..rId5
/// are taken by the master, theme and property parts.
const FIRST_SLIDE_REL: usize = 6;

/// Picture formats a presentation can reference directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MediaKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
}

impl MediaKind {
    /// Media kind for a decoded container format, if it can be embedded as-is.
    pub fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::Bmp => Some(Self::Bmp),
            ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }
}

/// Encoded picture bytes and their kind.
#[derive(Debug, Clone)]
pub struct SlideMedia {
    pub kind: MediaKind,
    pub data: Vec<u8>,
}

/// One slide: a picture at a fixed position.
#[derive(Debug, Clone)]
pub struct SlidePicture {
    /// Shown as the picture's name and alt text.
    pub name: String,
    pub media: SlideMedia,
    pub rect: EmuRect,
}

/// In-memory presentation, serialised in one pass by [`DeckPackage::write_to`].
#[derive(Debug, Clone)]
pub struct DeckPackage {
    title: String,
    canvas: SlideCanvas,
    slides: Vec<SlidePicture>,
}

impl DeckPackage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            canvas: SlideCanvas::STANDARD,
            slides: Vec::new(),
        }
    }

    pub fn canvas(&self) -> SlideCanvas {
        self.canvas
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn add_slide(&mut self, picture: SlidePicture) {
        self.slides.push(picture);
    }

    /// Serialise to an in-memory `.pptx`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Write every part of the package into `writer` and return it.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let xml = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        // Pictures are already compressed.
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        put(&mut zip, "[Content_Types].xml", xml, self.content_types().as_bytes())?;
        put(&mut zip, "_rels/.rels", xml, root_rels().as_bytes())?;
        put(&mut zip, "docProps/core.xml", xml, self.core_props().as_bytes())?;
        put(&mut zip, "docProps/app.xml", xml, self.app_props().as_bytes())?;
        put(&mut zip, "ppt/presentation.xml", xml, self.presentation().as_bytes())?;
        put(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            xml,
            self.presentation_rels().as_bytes(),
        )?;
        put(&mut zip, "ppt/slideMasters/slideMaster1.xml", xml, SLIDE_MASTER.as_bytes())?;
        put(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            xml,
            SLIDE_MASTER_RELS.as_bytes(),
        )?;
        put(&mut zip, "ppt/slideLayouts/slideLayout1.xml", xml, SLIDE_LAYOUT.as_bytes())?;
        put(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            xml,
            SLIDE_LAYOUT_RELS.as_bytes(),
        )?;
        put(&mut zip, "ppt/theme/theme1.xml", xml, THEME.as_bytes())?;
        put(&mut zip, "ppt/presProps.xml", xml, PRES_PROPS.as_bytes())?;
        put(&mut zip, "ppt/viewProps.xml", xml, VIEW_PROPS.as_bytes())?;
        put(&mut zip, "ppt/tableStyles.xml", xml, TABLE_STYLES.as_bytes())?;

        for (index, slide) in self.slides.iter().enumerate() {
            let number = index + 1;
            let media_name = format!("image{number}.{}", slide.media.kind.extension());
            put(
                &mut zip,
                &format!("ppt/slides/slide{number}.xml"),
                xml,
                slide_xml(slide).as_bytes(),
            )?;
            put(
                &mut zip,
                &format!("ppt/slides/_rels/slide{number}.xml.rels"),
                xml,
                slide_rels(&media_name).as_bytes(),
            )?;
            put(&mut zip, &format!("ppt/media/{media_name}"), stored, &slide.media.data)?;
        }

        zip.finish()
            .map_err(|err| BindwerkError::DeckError(format!("failed to finish package: {err}")))
    }

    fn content_types(&self) -> String {
        let kinds: BTreeSet<MediaKind> = self.slides.iter().map(|s| s.media.kind).collect();
        let mut out = String::from(XML_DECL);
        out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
        out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        for kind in kinds {
            out.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                kind.extension(),
                kind.content_type()
            ));
        }
        for (part, content_type) in [
            ("/ppt/presentation.xml", CT_PRESENTATION),
            ("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER),
            ("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT),
            ("/ppt/theme/theme1.xml", CT_THEME),
            ("/ppt/presProps.xml", CT_PRES_PROPS),
            ("/ppt/viewProps.xml", CT_VIEW_PROPS),
            ("/ppt/tableStyles.xml", CT_TABLE_STYLES),
            ("/docProps/core.xml", CT_CORE),
            ("/docProps/app.xml", CT_EXTENDED),
        ] {
            out.push_str(&format!(r#"<Override PartName="{part}" ContentType="{content_type}"/>"#));
        }
        for number in 1..=self.slides.len() {
            out.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{number}.xml" ContentType="{CT_SLIDE}"/>"#
            ));
        }
        out.push_str("</Types>");
        out
    }

    fn core_props(&self) -> String {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        format!(
            "{XML_DECL}<cp:coreProperties \
             xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
             xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
             xmlns:dcterms=\"http://purl.org/dc/terms/\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
             <dc:title>{title}</dc:title>\
             <dc:creator>Bindwerk</dc:creator>\
             <dcterms:created xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:created>\
             <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:modified>\
             </cp:coreProperties>",
            title = escape(self.title.as_str()),
        )
    }

    fn app_props(&self) -> String {
        format!(
            "{XML_DECL}<Properties \
             xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\">\
             <Application>Bindwerk</Application>\
             <Slides>{}</Slides>\
             </Properties>",
            self.slides.len()
        )
    }

    fn presentation(&self) -> String {
        let mut slide_ids = String::new();
        for index in 0..self.slides.len() {
            slide_ids.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                FIRST_SLIDE_ID + index,
                FIRST_SLIDE_REL + index
            ));
        }
        format!(
            "{XML_DECL}<p:presentation xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\" saveSubsetFonts=\"1\">\
             <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
             <p:sldIdLst>{slide_ids}</p:sldIdLst>\
             <p:sldSz cx=\"{cx}\" cy=\"{cy}\" type=\"screen4x3\"/>\
             <p:notesSz cx=\"{cy}\" cy=\"{cx}\"/>\
             <p:defaultTextStyle/>\
             </p:presentation>",
            cx = self.canvas.width_emu(),
            cy = self.canvas.height_emu(),
        )
    }

    fn presentation_rels(&self) -> String {
        let mut rels = vec![
            relationship(1, REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
            relationship(2, REL_THEME, "theme/theme1.xml"),
            relationship(3, REL_PRES_PROPS, "presProps.xml"),
            relationship(4, REL_VIEW_PROPS, "viewProps.xml"),
            relationship(5, REL_TABLE_STYLES, "tableStyles.xml"),
        ];
        for index in 0..self.slides.len() {
            rels.push(relationship(
                FIRST_SLIDE_REL + index,
                REL_SLIDE,
                &format!("slides/slide{}.xml", index + 1),
            ));
        }
        relationships(&rels)
    }
}

fn put<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, options: SimpleFileOptions, data: &[u8]) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|err| BindwerkError::DeckError(format!("failed to add {name}: {err}")))?;
    zip.write_all(data)?;
    Ok(())
}

fn relationship(id: usize, kind: &str, target: &str) -> String {
    format!(r#"<Relationship Id="rId{id}" Type="{kind}" Target="{target}"/>"#)
}

fn relationships(items: &[String]) -> String {
    format!("{XML_DECL}<Relationships xmlns=\"{NS_PKG_RELS}\">{}</Relationships>", items.concat())
}

fn root_rels() -> String {
    relationships(&[
        relationship(1, REL_OFFICE_DOC, "ppt/presentation.xml"),
        relationship(2, REL_CORE, "docProps/core.xml"),
        relationship(3, REL_EXTENDED, "docProps/app.xml"),
    ])
}

fn slide_rels(media_name: &str) -> String {
    relationships(&[
        relationship(1, REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
        relationship(2, REL_IMAGE, &format!("../media/{media_name}")),
    ])
}

fn slide_xml(slide: &SlidePicture) -> String {
    let name = escape(slide.name.as_str());
    let EmuRect { x, y, cx, cy } = slide.rect;
    format!(
        "{XML_DECL}<p:sld xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\">\
         <p:cSld><p:spTree>\
         <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
         <p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/>\
         <a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>\
         <p:pic>\
         <p:nvPicPr><p:cNvPr id=\"2\" name=\"{name}\" descr=\"{name}\"/>\
         <p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>\
         <p:blipFill><a:blip r:embed=\"rId2\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
         <p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr>\
         </p:pic>\
         </p:spTree></p:cSld>\
         <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>\
         </p:sld>"
    )
}

const SLIDE_MASTER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
    r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
    r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    r#"<p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles>"#,
    r#"</p:sldMaster>"#,
);

const SLIDE_MASTER_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>"#,
    r#"</Relationships>"#,
);

const SLIDE_LAYOUT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">"#,
    r#"<p:cSld name="Blank"><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    r#"</p:sldLayout>"#,
);

const SLIDE_LAYOUT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>"#,
    r#"</Relationships>"#,
);

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">"#,
    r#"<a:themeElements>"#,
    r#"<a:clrScheme name="Office">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#,
    r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1F497D"/></a:dk2>"#,
    r#"<a:lt2><a:srgbClr val="EEECE1"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4F81BD"/></a:accent1>"#,
    r#"<a:accent2><a:srgbClr val="C0504D"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="9BBB59"/></a:accent3>"#,
    r#"<a:accent4><a:srgbClr val="8064A2"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="4BACC6"/></a:accent5>"#,
    r#"<a:accent6><a:srgbClr val="F79646"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0000FF"/></a:hlink>"#,
    r#"<a:folHlink><a:srgbClr val="800080"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Office">"#,
    r#"<a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="Office">"#,
    r#"<a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:fillStyleLst>"#,
    r#"<a:lnStyleLst>"#,
    r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst>"#,
    r#"<a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:bgFillStyleLst>"#,
    r#"</a:fmtScheme>"#,
    r#"</a:themeElements>"#,
    r#"<a:objectDefaults/><a:extraClrSchemeLst/>"#,
    r#"</a:theme>"#,
);

const PRES_PROPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:presentationPr xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#,
);

const VIEW_PROPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:viewPr xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:normalViewPr/><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#,
);

const TABLE_STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:tblStyleLst xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"def="{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}"/>"#,
);
