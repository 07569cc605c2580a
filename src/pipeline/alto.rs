//! ALTO v4 generation from the text layer of a single-page PDF.
//!
//! pdfium reports text as *segments*: runs of characters sharing a font and
//! baseline, each with a bounding box in PDF points (origin bottom-left).
//! Segments are turned into [`TextRun`]s in a top-left coordinate system,
//! split into words, grouped into lines by vertical overlap, scaled to the
//! output unit and written with `quick-xml`.
//!
//! Coordinates are in pixels of the paired page image when there is one.
//! Without an image they are given in `inch1200` (1/1200 inch), ALTO's unit
//! closest to the PDF's own point grid.

use crate::error::FulltextError;
use pdfium_render::prelude::*;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::path::{Path, PathBuf};
use tracing::debug;

const ALTO_NS: &str = "http://www.loc.gov/standards/alto/ns-v4#";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const ALTO_SCHEMA: &str =
    "http://www.loc.gov/standards/alto/ns-v4# http://www.loc.gov/standards/alto/v4/alto-4-2.xsd";

/// PDF user space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// A run of text in PDF points, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl TextRun {
    fn center_y(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementUnit {
    Pixel,
    Inch1200,
}

impl MeasurementUnit {
    fn as_str(self) -> &'static str {
        match self {
            MeasurementUnit::Pixel => "pixel",
            MeasurementUnit::Inch1200 => "inch1200",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub hpos: u32,
    pub vpos: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AltoWord {
    pub content: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AltoLine {
    pub rect: Rect,
    pub words: Vec<AltoWord>,
}

/// Everything written into one ALTO file.
#[derive(Debug, Clone, PartialEq)]
pub struct AltoPage {
    pub unit: MeasurementUnit,
    pub image_file_name: Option<String>,
    pub physical_number: u32,
    pub width: u32,
    pub height: u32,
    pub lines: Vec<AltoLine>,
}

/// Write the ALTO file for `page_pdf` (its first page) into `alto_dir`.
pub fn write_alto_file(
    pdfium: &Pdfium,
    page_pdf: &Path,
    alto_dir: &Path,
    image: Option<&Path>,
) -> Result<PathBuf, FulltextError> {
    let read_err = |detail: String| FulltextError::PdfRead {
        path: page_pdf.to_path_buf(),
        detail,
    };

    let document = pdfium
        .load_pdf_from_file(page_pdf, None)
        .map_err(|e| read_err(format!("{:?}", e)))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| read_err(format!("{:?}", e)))?;

    let (page_width, page_height) =
        checked_page_size(page.width().value, page.height().value).map_err(read_err)?;
    let text = page.text().map_err(|e| read_err(format!("{:?}", e)))?;
    let runs: Vec<TextRun> = text
        .segments()
        .iter()
        .map(|segment| {
            let bounds = segment.bounds();
            let (left, right) = (bounds.left().value, bounds.right().value);
            let (bottom, top) = (bounds.bottom().value, bounds.top().value);
            TextRun {
                text: segment.text(),
                left,
                top: page_height - top,
                width: (right - left).max(0.0),
                height: (top - bottom).max(0.0),
            }
        })
        .collect();

    let (unit, scale, image_file_name) = match image {
        Some(image_path) => {
            let (pixel_width, _) =
                image::image_dimensions(image_path).map_err(|e| FulltextError::PdfRead {
                    path: image_path.to_path_buf(),
                    detail: e.to_string(),
                })?;
            let name = image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            (MeasurementUnit::Pixel, pixel_width as f32 / page_width, name)
        }
        None => (MeasurementUnit::Inch1200, 1200.0 / POINTS_PER_INCH, None),
    };

    let stem = page_pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());

    let alto = AltoPage {
        unit,
        image_file_name,
        physical_number: stem.parse().unwrap_or(1),
        width: to_unit(page_width, scale),
        height: to_unit(page_height, scale),
        lines: layout_lines(&runs, scale),
    };

    let xml = write_alto(&alto).map_err(|e| FulltextError::AltoFailed {
        path: page_pdf.to_path_buf(),
        detail: e.to_string(),
    })?;

    let path = alto_dir.join(format!("{stem}.xml"));
    std::fs::write(&path, xml).map_err(|e| FulltextError::PdfWrite {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    debug!(
        "Wrote {} ({} lines, unit {})",
        path.display(),
        alto.lines.len(),
        alto.unit.as_str()
    );
    Ok(path)
}

/// Reject degenerate media boxes; every coordinate is scaled by their size.
fn checked_page_size(width: f32, height: f32) -> Result<(f32, f32), String> {
    if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
        Ok((width, height))
    } else {
        Err(format!("page has zero size ({width} x {height} pt)"))
    }
}

fn to_unit(points: f32, scale: f32) -> u32 {
    (points * scale).round().max(0.0) as u32
}

/// Split runs into words and group words into lines.
///
/// A word joins the current line while its vertical centre lies inside the
/// line's band; otherwise it starts a new line. Word boxes inside a run are
/// apportioned by character count.
pub fn layout_lines(runs: &[TextRun], scale: f32) -> Vec<AltoLine> {
    let mut lines: Vec<Vec<TextRun>> = Vec::new();

    for word in runs.iter().flat_map(split_words) {
        let joins_current = lines.last().and_then(|line| line.last()).is_some_and(|prev| {
            let band_top = prev.top;
            let band_bottom = prev.top + prev.height;
            let center = word.center_y();
            center >= band_top && center <= band_bottom
        });
        if joins_current {
            if let Some(line) = lines.last_mut() {
                line.push(word);
            }
        } else {
            lines.push(vec![word]);
        }
    }

    lines
        .into_iter()
        .map(|words| {
            let words: Vec<AltoWord> = words
                .into_iter()
                .map(|w| AltoWord {
                    rect: scaled_rect(w.left, w.top, w.width, w.height, scale),
                    content: w.text,
                })
                .collect();
            AltoLine {
                rect: union(words.iter().map(|w| w.rect)),
                words,
            }
        })
        .collect()
}

fn split_words(run: &TextRun) -> Vec<TextRun> {
    let chars: Vec<char> = run.text.chars().collect();
    let total = chars.len().max(1) as f32;
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for i in 0..=chars.len() {
        let is_space = i == chars.len() || chars[i].is_whitespace();
        match (start, is_space) {
            (None, false) => start = Some(i),
            (Some(s), true) => {
                words.push(TextRun {
                    text: chars[s..i].iter().collect(),
                    left: run.left + run.width * s as f32 / total,
                    top: run.top,
                    width: run.width * (i - s) as f32 / total,
                    height: run.height,
                });
                start = None;
            }
            _ => {}
        }
    }
    words
}

fn scaled_rect(left: f32, top: f32, width: f32, height: f32, scale: f32) -> Rect {
    Rect {
        hpos: to_unit(left, scale),
        vpos: to_unit(top, scale),
        width: to_unit(width, scale),
        height: to_unit(height, scale),
    }
}

fn union(rects: impl Iterator<Item = Rect>) -> Rect {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for r in rects {
        let (l, t) = (r.hpos, r.vpos);
        let (rr, b) = (l.saturating_add(r.width), t.saturating_add(r.height));
        bounds = Some(match bounds {
            None => (l, t, rr, b),
            Some((bl, bt, br, bb)) => (bl.min(l), bt.min(t), br.max(rr), bb.max(b)),
        });
    }
    bounds
        .map(|(l, t, r, b)| Rect {
            hpos: l,
            vpos: t,
            width: r - l,
            height: b - t,
        })
        .unwrap_or_default()
}

/// Serialise an [`AltoPage`] as an ALTO v4 document.
pub fn write_alto(page: &AltoPage) -> Result<String, quick_xml::Error> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    start(
        &mut w,
        "alto",
        &[
            ("xmlns", ALTO_NS.to_string()),
            ("xmlns:xsi", XSI_NS.to_string()),
            ("xsi:schemaLocation", ALTO_SCHEMA.to_string()),
        ],
    )?;

    start(&mut w, "Description", &[])?;
    text_element(&mut w, "MeasurementUnit", page.unit.as_str())?;
    if let Some(ref name) = page.image_file_name {
        start(&mut w, "sourceImageInformation", &[])?;
        text_element(&mut w, "fileName", name)?;
        end(&mut w, "sourceImageInformation")?;
    }
    start(&mut w, "Processing", &[("ID", "PROC_0".to_string())])?;
    start(&mut w, "processingSoftware", &[])?;
    text_element(&mut w, "softwareName", env!("CARGO_PKG_NAME"))?;
    text_element(&mut w, "softwareVersion", env!("CARGO_PKG_VERSION"))?;
    end(&mut w, "processingSoftware")?;
    end(&mut w, "Processing")?;
    end(&mut w, "Description")?;

    let page_id = format!("Page{}", page.physical_number);
    start(&mut w, "Layout", &[])?;
    start(
        &mut w,
        "Page",
        &[
            ("ID", page_id.clone()),
            ("PHYSICAL_IMG_NR", page.physical_number.to_string()),
            ("WIDTH", page.width.to_string()),
            ("HEIGHT", page.height.to_string()),
        ],
    )?;
    let print_space = Rect {
        hpos: 0,
        vpos: 0,
        width: page.width,
        height: page.height,
    };
    start(&mut w, "PrintSpace", &rect_attrs(None, print_space))?;

    if !page.lines.is_empty() {
        let block_id = format!("{page_id}_Block1");
        let block_rect = union(page.lines.iter().map(|l| l.rect));
        start(&mut w, "TextBlock", &rect_attrs(Some(block_id.clone()), block_rect))?;

        for (li, line) in page.lines.iter().enumerate() {
            let line_id = format!("{block_id}_Line{}", li + 1);
            start(&mut w, "TextLine", &rect_attrs(Some(line_id.clone()), line.rect))?;
            for (wi, word) in line.words.iter().enumerate() {
                if wi > 0 {
                    empty(&mut w, "SP", &[])?;
                }
                let mut attrs = rect_attrs(Some(format!("{line_id}_Word{}", wi + 1)), word.rect);
                attrs.push(("CONTENT", word.content.clone()));
                empty(&mut w, "String", &attrs)?;
            }
            end(&mut w, "TextLine")?;
        }
        end(&mut w, "TextBlock")?;
    }

    end(&mut w, "PrintSpace")?;
    end(&mut w, "Page")?;
    end(&mut w, "Layout")?;
    end(&mut w, "alto")?;

    // Every event above was built from `&str`, so the buffer is UTF-8.
    Ok(String::from_utf8_lossy(&w.into_inner()).into_owned())
}

fn rect_attrs(id: Option<String>, r: Rect) -> Vec<(&'static str, String)> {
    let mut attrs = Vec::with_capacity(5);
    if let Some(id) = id {
        attrs.push(("ID", id));
    }
    attrs.push(("HPOS", r.hpos.to_string()));
    attrs.push(("VPOS", r.vpos.to_string()));
    attrs.push(("WIDTH", r.width.to_string()));
    attrs.push(("HEIGHT", r.height.to_string()));
    attrs
}

fn tag<'a>(name: &'a str, attrs: &[(&str, String)]) -> BytesStart<'a> {
    let mut tag = BytesStart::new(name);
    for (key, value) in attrs {
        tag.push_attribute((*key, value.as_str()));
    }
    tag
}

fn start(w: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, String)]) -> Result<(), quick_xml::Error> {
    w.write_event(Event::Start(tag(name, attrs)))
}

fn empty(w: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, String)]) -> Result<(), quick_xml::Error> {
    w.write_event(Event::Empty(tag(name, attrs)))
}

fn end(w: &mut Writer<Vec<u8>>, name: &str) -> Result<(), quick_xml::Error> {
    w.write_event(Event::End(BytesEnd::new(name)))
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), quick_xml::Error> {
    start(w, name, &[])?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    end(w, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, left: f32, top: f32, width: f32, height: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            left,
            top,
            width,
            height,
        }
    }

    #[test]
    fn words_are_apportioned_by_characters() {
        let words = split_words(&run("ab cd", 0.0, 10.0, 50.0, 12.0));
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "ab");
        assert_eq!(words[0].left, 0.0);
        assert_eq!(words[0].width, 20.0);
        assert_eq!(words[1].text, "cd");
        assert_eq!(words[1].left, 30.0);
    }

    #[test]
    fn whitespace_only_run_yields_nothing() {
        assert!(split_words(&run("   ", 0.0, 0.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn runs_on_the_same_band_share_a_line() {
        let runs = vec![
            run("Der Tragödie", 72.0, 100.0, 120.0, 14.0),
            run("erster Teil", 200.0, 101.0, 100.0, 14.0),
            run("Zueignung", 72.0, 140.0, 90.0, 14.0),
        ];
        let lines = layout_lines(&runs, 1.0);
        assert_eq!(lines.len(), 2);
        let first: Vec<_> = lines[0].words.iter().map(|w| w.content.as_str()).collect();
        assert_eq!(first, vec!["Der", "Tragödie", "erster", "Teil"]);
        assert_eq!(lines[0].rect.hpos, 72);
        assert_eq!(lines[0].rect.width, 228);
        assert_eq!(lines[1].words[0].content, "Zueignung");
    }

    #[test]
    fn coordinates_are_scaled() {
        let lines = layout_lines(&[run("x", 72.0, 72.0, 7.2, 7.2)], 300.0 / 72.0);
        let r = lines[0].words[0].rect;
        assert_eq!((r.hpos, r.vpos, r.width, r.height), (300, 300, 30, 30));
    }

    #[test]
    fn degenerate_page_size_is_rejected() {
        assert_eq!(checked_page_size(595.0, 842.0), Ok((595.0, 842.0)));
        assert!(checked_page_size(0.0, 842.0).unwrap_err().contains("zero size"));
        assert!(checked_page_size(595.0, -1.0).is_err());
        assert!(checked_page_size(f32::NAN, 842.0).is_err());
    }

    #[test]
    fn unbounded_scale_saturates_instead_of_overflowing() {
        let lines = layout_lines(&[run("ab cd", 1.0, 1.0, 2.0, 2.0)], 2480.0 / 0.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].words.len(), 2);
        assert_eq!(lines[0].rect.hpos, u32::MAX);
        assert_eq!(lines[0].rect.width, 0);
    }

    #[test]
    fn writes_alto_document() {
        let page = AltoPage {
            unit: MeasurementUnit::Pixel,
            image_file_name: Some("00000004.tif".to_string()),
            physical_number: 4,
            width: 2480,
            height: 3508,
            lines: layout_lines(&[run("Habe nun, ach! <Philosophie>", 10.0, 20.0, 280.0, 12.0)], 1.0),
        };
        let xml = write_alto(&page).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<MeasurementUnit>pixel</MeasurementUnit>"));
        assert!(xml.contains("<fileName>00000004.tif</fileName>"));
        assert!(xml.contains("PHYSICAL_IMG_NR=\"4\""));
        assert!(xml.contains("ID=\"Page4_Block1_Line1_Word1\""));
        assert!(xml.contains("CONTENT=\"Habe\""));
        assert!(xml.contains("CONTENT=\"&lt;Philosophie&gt;\""));
        assert_eq!(xml.matches("<SP/>").count(), 3);
    }

    #[test]
    fn empty_page_has_no_text_block() {
        let page = AltoPage {
            unit: MeasurementUnit::Inch1200,
            image_file_name: None,
            physical_number: 1,
            width: 9917,
            height: 14033,
            lines: Vec::new(),
        };
        let xml = write_alto(&page).unwrap();
        assert!(xml.contains("<MeasurementUnit>inch1200</MeasurementUnit>"));
        assert!(!xml.contains("TextBlock"));
        assert!(!xml.contains("sourceImageInformation"));
    }
}
