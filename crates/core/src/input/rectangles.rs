//! Readers for saved rectangle sets and intersection sets.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

use crate::error::Result;
use crate::layout::types::{IntersectionSet, MergedRegion, RegionKind, TextFragment};
use crate::utils::{Rect, parse_bbox};

use super::pdfminer::attr;

struct PendingText {
    bbox: Option<Rect>,
    content: String,
}

/// Read a `<rectangles>` document back into regions.
///
/// Rectangles and texts with an unparsable bbox are skipped.
pub fn read_rectangles(xml: &str, page_number: u32) -> Result<Vec<MergedRegion>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut regions = Vec::new();
    let mut current: Option<MergedRegion> = None;
    let mut skipping = false;
    let mut text: Option<PendingText> = None;

    let parse = |raw: Option<String>, what: &str| -> Option<Rect> {
        let raw = raw.unwrap_or_default();
        match parse_bbox(&raw) {
            Ok(bbox) => Some(bbox),
            Err(e) => {
                warn!("skipping {what}: {e}");
                None
            }
        }
    };

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"rectangle" => {
                    let region = parse(attr(&e, b"bbox")?, "rectangle").map(|bbox| MergedRegion {
                        bbox,
                        texts: Vec::new(),
                        kind: RegionKind::Merged,
                    });
                    skipping = region.is_none();
                    match (region, empty) {
                        (Some(r), true) => regions.push(r),
                        (r, _) => current = r,
                    }
                }
                b"text" if !skipping => {
                    let pending = PendingText {
                        bbox: parse(attr(&e, b"bbox")?, "text"),
                        content: String::new(),
                    };
                    if empty {
                        push_text(current.as_mut(), pending, page_number);
                    } else {
                        text = Some(pending);
                    }
                }
                _ => {}
            },
            Event::Text(e) => {
                if let Some(t) = text.as_mut() {
                    t.content.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"text" => {
                    if let Some(t) = text.take() {
                        push_text(current.as_mut(), t, page_number);
                    }
                }
                b"rectangle" => {
                    if let Some(r) = current.take() {
                        regions.push(r);
                    }
                    skipping = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(regions)
}

fn push_text(region: Option<&mut MergedRegion>, text: PendingText, page_number: u32) {
    if let (Some(region), Some(bbox)) = (region, text.bbox) {
        region
            .texts
            .push(TextFragment::new(bbox, text.content.trim(), page_number));
    }
}

/// Read an `<intersections>` document of `<point x y/>` elements.
pub fn read_intersections(xml: &str) -> Result<IntersectionSet> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut points = IntersectionSet::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"point" => {
                let x = attr(&e, b"x")?.and_then(|v| v.trim().parse::<f64>().ok());
                let y = attr(&e, b"y")?.and_then(|v| v.trim().parse::<f64>().ok());
                match (x, y) {
                    (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                        points.insert(x, y);
                    }
                    _ => warn!("skipping malformed intersection point"),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_rectangles() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<rectangles>
<rectangle bbox="0.000,0.000,100.000,50.000">
<text bbox="10.000,10.000,20.000,20.000"> A &lt;1&gt; </text>
<text bbox="broken">lost</text>
</rectangle>
<rectangle bbox="nope">
<text bbox="1,1,2,2">skipped</text>
</rectangle>
<rectangle bbox="200,0,300,50" />
</rectangles>
"#;
        let regions = read_rectangles(xml, 4).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].texts.len(), 1);
        assert_eq!(regions[0].texts[0].text, "A <1>");
        assert_eq!(regions[0].texts[0].page_number, 4);
        assert_eq!(regions[1].bbox, (200.0, 0.0, 300.0, 50.0));
        assert!(regions[1].texts.is_empty());
    }

    #[test]
    fn test_read_intersections() {
        let xml = r#"<intersections>
<point x="100.000" y="0.000" />
<point x="0.000" y="0.000" />
<point x="bad" y="1" />
</intersections>"#;
        let points = read_intersections(xml).unwrap();
        assert_eq!(points.to_vec(), vec![(0.0, 0.0), (100.0, 0.0)]);
    }
}
