//! PPT Report Generator Module
//! Writes the report as a PowerPoint deck, one slide per report section.
//!
//! Uses direct ZIP/XML generation: text sections become text boxes, charts
//! become embedded PNG pictures and tables become native DrawingML tables.

use crate::charts::TableSpec;
use log::info;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Error, Debug)]
pub enum PptError {
    #[error("Failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write deck: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write deck archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// EMU (English Metric Units) conversion: 914400 EMU = 1 inch
const EMU_PER_INCH: i64 = 914400;
/// 16:9 slide dimensions (in EMU)
const SLIDE_WIDTH: i64 = 12192000; // 13.333 inches
const SLIDE_HEIGHT: i64 = 6858000; // 7.5 inches

const MARGIN: i64 = EMU_PER_INCH / 2;
const TITLE_HEIGHT: i64 = EMU_PER_INCH * 3 / 4;
const CAPTION_HEIGHT: i64 = EMU_PER_INCH / 2;
const TABLE_ROW_HEIGHT: i64 = 370840;

/// Content of one slide, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum Slide {
    Text {
        title: String,
        paragraphs: Vec<String>,
    },
    Image {
        title: String,
        png: Vec<u8>,
        /// Pixel size, used to keep the aspect ratio.
        width: u32,
        height: u32,
        caption: Option<String>,
    },
    Table(TableSpec),
}

/// Position and size of a shape on the slide (EMU).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

/// PPT generator for the report deck
pub struct PptGenerator;

impl PptGenerator {
    /// Write the deck to a file.
    pub fn generate(slides: &[Slide], output_path: &Path, title: &str) -> Result<(), PptError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PptError::Create {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(output_path).map_err(|source| PptError::Create {
            path: output_path.to_path_buf(),
            source,
        })?;
        Self::write_to(slides, file, title)?;

        let image_count = slides
            .iter()
            .filter(|s| matches!(s, Slide::Image { .. }))
            .count();
        info!(
            "PPT generated: {} ({} slides, {} images)",
            output_path.display(),
            slides.len(),
            image_count
        );
        Ok(())
    }

    /// Write the deck into any seekable writer.
    pub fn write_to<W: Write + Seek>(
        slides: &[Slide],
        writer: W,
        title: &str,
    ) -> Result<W, PptError> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default();
        let slide_count = slides.len();

        // 1. [Content_Types].xml
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml(slide_count).as_bytes())?;

        // 2. _rels/.rels
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        // 3. ppt/_rels/presentation.xml.rels
        zip.start_file("ppt/_rels/presentation.xml.rels", options)?;
        zip.write_all(Self::presentation_rels_xml(slide_count).as_bytes())?;

        // 4. ppt/presentation.xml
        zip.start_file("ppt/presentation.xml", options)?;
        zip.write_all(Self::presentation_xml(slide_count).as_bytes())?;

        // 5. Slides, their relationships and media
        let mut image_idx = 0;
        for (slide_idx, slide) in slides.iter().enumerate() {
            let slide_num = slide_idx + 1;
            let image_id = match slide {
                Slide::Image { png, .. } => {
                    image_idx += 1;
                    zip.start_file(format!("ppt/media/image{}.png", image_idx), options)?;
                    zip.write_all(png)?;
                    Some(image_idx)
                }
                _ => None,
            };

            zip.start_file(
                format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
                options,
            )?;
            zip.write_all(Self::slide_rels_xml(image_id).as_bytes())?;

            zip.start_file(format!("ppt/slides/slide{}.xml", slide_num), options)?;
            zip.write_all(Self::slide_xml(slide).as_bytes())?;
        }

        // 6. Slide layouts
        zip.start_file("ppt/slideLayouts/slideLayout1.xml", options)?;
        zip.write_all(Self::slide_layout_xml().as_bytes())?;
        zip.start_file("ppt/slideLayouts/_rels/slideLayout1.xml.rels", options)?;
        zip.write_all(Self::layout_rels_xml().as_bytes())?;

        // 7. Slide master
        zip.start_file("ppt/slideMasters/slideMaster1.xml", options)?;
        zip.write_all(Self::slide_master_xml().as_bytes())?;
        zip.start_file("ppt/slideMasters/_rels/slideMaster1.xml.rels", options)?;
        zip.write_all(Self::master_rels_xml().as_bytes())?;

        // 8. Theme
        zip.start_file("ppt/theme/theme1.xml", options)?;
        zip.write_all(Self::theme_xml().as_bytes())?;

        // 9. docProps
        zip.start_file("docProps/core.xml", options)?;
        zip.write_all(Self::core_props_xml(title).as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(Self::app_props_xml(slide_count).as_bytes())?;

        Ok(zip.finish()?)
    }

    fn content_types_xml(slide_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
"#.to_string();

        for i in 1..=slide_count {
            xml.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                i
            ));
            xml.push('\n');
        }
        xml.push_str("</Types>");
        xml
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#
    }

    fn presentation_rels_xml(slide_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
"#.to_string();

        for i in 1..=slide_count {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                i + 2, i
            ));
            xml.push('\n');
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn presentation_xml(slide_count: usize) -> String {
        let mut slide_ids = String::new();
        for i in 1..=slide_count {
            slide_ids.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                255 + i,
                i + 2
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" saveSubsetFonts="1">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
<p:sldIdLst>{}</p:sldIdLst>
<p:sldSz cx="{}" cy="{}"/>
<p:notesSz cx="{}" cy="{}"/>
</p:presentation>"#,
            slide_ids, SLIDE_WIDTH, SLIDE_HEIGHT, SLIDE_HEIGHT, SLIDE_WIDTH
        )
    }

    fn slide_rels_xml(image_id: Option<usize>) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
"#.to_string();

        if let Some(id) = image_id {
            xml.push_str(&format!(
                r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{}.png"/>"#,
                id
            ));
            xml.push('\n');
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn title_frame() -> Frame {
        Frame {
            x: MARGIN,
            y: MARGIN / 2,
            w: SLIDE_WIDTH - 2 * MARGIN,
            h: TITLE_HEIGHT,
        }
    }

    fn body_frame(with_caption: bool) -> Frame {
        let top = MARGIN / 2 + TITLE_HEIGHT + MARGIN / 4;
        let bottom = if with_caption {
            SLIDE_HEIGHT - MARGIN / 2 - CAPTION_HEIGHT
        } else {
            SLIDE_HEIGHT - MARGIN / 2
        };
        Frame {
            x: MARGIN,
            y: top,
            w: SLIDE_WIDTH - 2 * MARGIN,
            h: bottom - top,
        }
    }

    fn caption_frame() -> Frame {
        Frame {
            x: MARGIN,
            y: SLIDE_HEIGHT - MARGIN / 2 - CAPTION_HEIGHT,
            w: SLIDE_WIDTH - 2 * MARGIN,
            h: CAPTION_HEIGHT,
        }
    }

    /// Largest frame with the image's aspect ratio that fits `bounds`, centered.
    fn fit_image(bounds: Frame, width: u32, height: u32) -> Frame {
        if width == 0 || height == 0 {
            return bounds;
        }
        let (w, h) = (width as i64, height as i64);
        let (fit_w, fit_h) = if bounds.w * h <= bounds.h * w {
            (bounds.w, bounds.w * h / w)
        } else {
            (bounds.h * w / h, bounds.h)
        };
        Frame {
            x: bounds.x + (bounds.w - fit_w) / 2,
            y: bounds.y + (bounds.h - fit_h) / 2,
            w: fit_w,
            h: fit_h,
        }
    }

    fn text_box_xml(id: usize, frame: Frame, paragraphs: &[String], size: u32, bold: bool) -> String {
        let runs: String = paragraphs
            .iter()
            .map(|p| {
                format!(
                    r#"<a:p><a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    size,
                    u8::from(bold),
                    xml_escape(p)
                )
            })
            .collect();
        format!(
            r#"
<p:sp>
<p:nvSpPr><p:cNvPr id="{}" name="TextBox {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
<p:spPr>
<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>
<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
<a:noFill/>
</p:spPr>
<p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{}</p:txBody>
</p:sp>"#,
            id, id, frame.x, frame.y, frame.w, frame.h, runs
        )
    }

    fn picture_xml(id: usize, frame: Frame) -> String {
        format!(
            r#"
<p:pic>
<p:nvPicPr>
<p:cNvPr id="{}" name="Picture {}"/>
<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>
<p:nvPr/>
</p:nvPicPr>
<p:blipFill>
<a:blip r:embed="rId2"/>
<a:stretch><a:fillRect/></a:stretch>
</p:blipFill>
<p:spPr>
<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>
<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
</p:spPr>
</p:pic>"#,
            id, id, frame.x, frame.y, frame.w, frame.h
        )
    }

    fn table_cell_xml(text: &str, header: bool) -> String {
        format!(
            r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="1400" b="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>"#,
            u8::from(header),
            xml_escape(text)
        )
    }

    fn table_xml(id: usize, frame: Frame, table: &TableSpec) -> String {
        let columns = table.headers.len().max(1) as i64;
        let col_width = frame.w / columns;
        let grid: String = (0..columns)
            .map(|_| format!(r#"<a:gridCol w="{}"/>"#, col_width))
            .collect();

        let mut rows = String::new();
        let header_cells: String = table
            .headers
            .iter()
            .map(|h| Self::table_cell_xml(h, true))
            .collect();
        rows.push_str(&format!(
            r#"<a:tr h="{}">{}</a:tr>"#,
            TABLE_ROW_HEIGHT, header_cells
        ));
        for row in &table.rows {
            let cells: String = row.iter().map(|c| Self::table_cell_xml(c, false)).collect();
            rows.push_str(&format!(r#"<a:tr h="{}">{}</a:tr>"#, TABLE_ROW_HEIGHT, cells));
        }

        let height = TABLE_ROW_HEIGHT * (table.rows.len() as i64 + 1);
        format!(
            r#"
<p:graphicFrame>
<p:nvGraphicFramePr><p:cNvPr id="{}" name="Table {}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>
<p:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></p:xfrm>
<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">
<a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{}</a:tblGrid>{}</a:tbl>
</a:graphicData></a:graphic>
</p:graphicFrame>"#,
            id,
            id,
            frame.x,
            frame.y,
            col_width * columns,
            height.min(frame.h),
            grid,
            rows
        )
    }

    fn slide_xml(slide: &Slide) -> String {
        let mut shapes = String::new();

        match slide {
            Slide::Text { title, paragraphs } => {
                shapes.push_str(&Self::text_box_xml(
                    2,
                    Self::title_frame(),
                    std::slice::from_ref(title),
                    2800,
                    true,
                ));
                shapes.push_str(&Self::text_box_xml(
                    3,
                    Self::body_frame(false),
                    paragraphs,
                    1800,
                    false,
                ));
            }
            Slide::Image {
                title,
                width,
                height,
                caption,
                ..
            } => {
                shapes.push_str(&Self::text_box_xml(
                    2,
                    Self::title_frame(),
                    std::slice::from_ref(title),
                    2400,
                    true,
                ));
                let frame = Self::fit_image(Self::body_frame(caption.is_some()), *width, *height);
                shapes.push_str(&Self::picture_xml(3, frame));
                if let Some(caption) = caption {
                    shapes.push_str(&Self::text_box_xml(
                        4,
                        Self::caption_frame(),
                        std::slice::from_ref(caption),
                        1200,
                        false,
                    ));
                }
            }
            Slide::Table(table) => {
                shapes.push_str(&Self::text_box_xml(
                    2,
                    Self::title_frame(),
                    std::slice::from_ref(&table.title),
                    2400,
                    true,
                ));
                shapes.push_str(&Self::table_xml(
                    3,
                    Self::body_frame(table.caption.is_some()),
                    table,
                ));
                if let Some(caption) = &table.caption {
                    shapes.push_str(&Self::text_box_xml(
                        4,
                        Self::caption_frame(),
                        std::slice::from_ref(caption),
                        1200,
                        false,
                    ));
                }
            }
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld>
<p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>
{}
</p:spTree>
</p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sld>"#,
            shapes
        )
    }

    fn slide_layout_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">
<p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sldLayout>"#
    }

    fn layout_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#
    }

    fn slide_master_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld>
<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>
</p:sldMaster>"#
    }

    fn master_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>
</Relationships>"#
    }

    fn theme_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Report Theme">
<a:themeElements>
<a:clrScheme name="Report"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="2C3E50"/></a:dk2><a:lt2><a:srgbClr val="ECF0F1"/></a:lt2><a:accent1><a:srgbClr val="3498DB"/></a:accent1><a:accent2><a:srgbClr val="E74C3C"/></a:accent2><a:accent3><a:srgbClr val="2ECC71"/></a:accent3><a:accent4><a:srgbClr val="F39C12"/></a:accent4><a:accent5><a:srgbClr val="9B59B6"/></a:accent5><a:accent6><a:srgbClr val="1ABC9C"/></a:accent6><a:hlink><a:srgbClr val="2980B9"/></a:hlink><a:folHlink><a:srgbClr val="8E44AD"/></a:folHlink></a:clrScheme>
<a:fontScheme name="Report"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>
<a:fmtScheme name="Report"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme>
</a:themeElements>
<a:objectDefaults/>
<a:extraClrSchemeLst/>
</a:theme>"#
    }

    fn core_props_xml(title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>{}</dc:title>
<dc:creator>UPI Report</dc:creator>
<cp:lastModifiedBy>UPI Report</cp:lastModifiedBy>
<cp:revision>1</cp:revision>
</cp:coreProperties>"#,
            xml_escape(title)
        )
    }

    fn app_props_xml(slide_count: usize) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<TotalTime>0</TotalTime>
<Application>UPI Report</Application>
<PresentationFormat>Widescreen</PresentationFormat>
<Slides>{}</Slides>
<Notes>0</Notes>
<HiddenSlides>0</HiddenSlides>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
<AppVersion>16.0000</AppVersion>
</Properties>"#,
            slide_count
        )
    }
}

/// Escape text for XML element content and attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn read_part(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut part = archive.by_name(name).unwrap();
        let mut text = String::new();
        part.read_to_string(&mut text).unwrap();
        text
    }

    fn sample_slides() -> Vec<Slide> {
        vec![
            Slide::Text {
                title: "Intro".to_string(),
                paragraphs: vec!["UPI & growth".to_string()],
            },
            Slide::Image {
                title: "Trend".to_string(),
                png: vec![0x89, b'P', b'N', b'G'],
                width: 1200,
                height: 700,
                caption: Some("Partial year".to_string()),
            },
            Slide::Table(TableSpec {
                title: "Means".to_string(),
                headers: vec!["Period".to_string(), "Months".to_string()],
                rows: vec![vec!["Pre-COVID".to_string(), "22".to_string()]],
                caption: None,
            }),
        ]
    }

    #[test]
    fn deck_has_one_slide_per_section_in_order() {
        let cursor = PptGenerator::write_to(&sample_slides(), Cursor::new(Vec::new()), "UPI")
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();

        let presentation = read_part(&mut archive, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 3);

        assert!(read_part(&mut archive, "ppt/slides/slide1.xml").contains("UPI &amp; growth"));
        let chart = read_part(&mut archive, "ppt/slides/slide2.xml");
        assert!(chart.contains("<p:pic>"));
        assert!(chart.contains("Partial year"));
        let table = read_part(&mut archive, "ppt/slides/slide3.xml");
        assert!(table.contains("<a:tbl>"));
        assert!(table.contains("Pre-COVID"));
        assert_eq!(table.matches("<a:tr ").count(), 2);
    }

    #[test]
    fn images_are_embedded_and_linked() {
        let cursor = PptGenerator::write_to(&sample_slides(), Cursor::new(Vec::new()), "UPI")
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();

        let mut media = Vec::new();
        archive
            .by_name("ppt/media/image1.png")
            .unwrap()
            .read_to_end(&mut media)
            .unwrap();
        assert_eq!(media, vec![0x89, b'P', b'N', b'G']);

        let rels = read_part(&mut archive, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels.contains("../media/image1.png"));
        let text_rels = read_part(&mut archive, "ppt/slides/_rels/slide1.xml.rels");
        assert!(!text_rels.contains("media"));
    }

    #[test]
    fn image_frame_keeps_aspect_ratio() {
        let bounds = Frame {
            x: 0,
            y: 0,
            w: 1000,
            h: 1000,
        };
        let frame = PptGenerator::fit_image(bounds, 200, 100);
        assert_eq!((frame.w, frame.h), (1000, 500));
        assert_eq!(frame.y, 250);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(xml_escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
