//! Reader for pdfminer-style page XML.
//!
//! Only the parts the layout stages need are kept: page size, `line` and
//! `curve` primitives (also inside `figure`s) and `textbox` contents.
//! Coordinate attributes are passed through unparsed so that the classifier
//! can count malformed primitives.

use itertools::Itertools;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use crate::error::Result;
use crate::layout::types::{PageInput, RawCurve, RawLine, TextFragment};
use crate::utils::parse_bbox;

const DEFAULT_PAGE_SIZE: f64 = 1000.0;

/// Value of attribute `name`, unescaped.
pub(crate) fn attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for a in e.attributes().flatten() {
        if a.key.as_ref() == name {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[derive(Default)]
struct TextboxState {
    bbox: Option<String>,
    lines: Vec<String>,
    in_text: bool,
}

impl TextboxState {
    fn content(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .join(" ")
    }
}

fn page_number(id: Option<&str>, position: usize) -> u32 {
    id.and_then(|s| s.trim().trim_start_matches("page").parse().ok())
        .unwrap_or(position as u32)
}

fn open_page(e: &BytesStart<'_>, position: usize) -> Result<PageInput> {
    let id = attr(e, b"id")?;
    let (width, height) = match attr(e, b"bbox")?.as_deref().map(parse_bbox) {
        Some(Ok((_, _, x1, y1))) => (x1, y1),
        _ => (DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE),
    };
    Ok(PageInput {
        page_number: page_number(id.as_deref(), position),
        width,
        height,
        ..PageInput::default()
    })
}

fn close_textbox(page: &mut PageInput, tb: TextboxState) {
    let content = tb.content();
    if content.is_empty() {
        return;
    }
    let Some(raw) = tb.bbox else {
        warn!("skipping textbox without bbox on page {}", page.page_number);
        return;
    };
    match parse_bbox(&raw) {
        Ok(bbox) => page
            .texts
            .push(TextFragment::new(bbox, content, page.page_number)),
        Err(e) => warn!("skipping textbox on page {}: {e}", page.page_number),
    }
}

/// Read every page of a pdfminer XML document.
pub fn read_pages(xml: &str) -> Result<Vec<PageInput>> {
    let mut reader = Reader::from_str(xml);
    // Whitespace-only <text> elements are word separators.
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut pages = Vec::new();
    let mut page: Option<PageInput> = None;
    let mut textbox: Option<TextboxState> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"page" => page = Some(open_page(&e, pages.len() + 1)?),
                b"textbox" => {
                    textbox = Some(TextboxState {
                        bbox: attr(&e, b"bbox")?,
                        ..TextboxState::default()
                    })
                }
                b"textline" => {
                    if let Some(tb) = textbox.as_mut() {
                        tb.lines.push(String::new());
                    }
                }
                b"text" => {
                    if let Some(tb) = textbox.as_mut() {
                        tb.in_text = true;
                    }
                }
                name => push_primitive(page.as_mut(), name, &e)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"page" => pages.push(open_page(&e, pages.len() + 1)?),
                name => push_primitive(page.as_mut(), name, &e)?,
            },
            Event::Text(e) => {
                if let Some(tb) = textbox.as_mut().filter(|tb| tb.in_text) {
                    let text = e.unescape()?;
                    match tb.lines.last_mut() {
                        Some(line) => line.push_str(&text),
                        None => tb.lines.push(text.into_owned()),
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"text" => {
                    if let Some(tb) = textbox.as_mut() {
                        tb.in_text = false;
                    }
                }
                b"textbox" => {
                    if let (Some(p), Some(tb)) = (page.as_mut(), textbox.take()) {
                        close_textbox(p, tb);
                    }
                }
                b"page" => {
                    if let Some(p) = page.take() {
                        debug!(
                            page = p.page_number,
                            lines = p.lines.len(),
                            curves = p.curves.len(),
                            texts = p.texts.len(),
                            "read page"
                        );
                        pages.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(p) = page.take() {
        warn!("page {} was not closed", p.page_number);
        pages.push(p);
    }
    Ok(pages)
}

fn push_primitive(page: Option<&mut PageInput>, name: &[u8], e: &BytesStart<'_>) -> Result<()> {
    let Some(page) = page else {
        return Ok(());
    };
    match name {
        b"line" => match attr(e, b"bbox")? {
            Some(bbox) => page.lines.push(RawLine { bbox }),
            None => warn!("skipping line without bbox on page {}", page.page_number),
        },
        b"curve" => match attr(e, b"pts")? {
            Some(pts) => page.curves.push(RawCurve { pts }),
            None => warn!("skipping curve without pts on page {}", page.page_number),
        },
        _ => {}
    }
    Ok(())
}
