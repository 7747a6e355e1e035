//! XML writers for rectangle sets, intersection sets and structured documents.
//!
//! Output is flat: one element per line, no indentation.

use std::borrow::Cow;
use std::io::Write;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::layout::types::{IntersectionSet, MappedRectangle, MergedRegion, TextFragment};
use crate::structure::{Document, NodeId};
use crate::utils::{Rect, bbox2str, enc};

static CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0b-\x0c\x0e-\x1f]").expect("valid control regex"));

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n";

/// XML writer over any [`Write`] sink.
pub struct XmlWriter<W: Write> {
    /// Output writer
    outfp: W,
    /// Strip control characters from text content
    stripcontrol: bool,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(outfp: W) -> Self {
        Self {
            outfp,
            stripcontrol: false,
        }
    }

    /// Create with options.
    pub fn with_options(outfp: W, stripcontrol: bool) -> Self {
        let mut writer = Self::new(outfp);
        writer.stripcontrol = stripcontrol;
        writer
    }

    /// Set whether to strip control characters.
    pub const fn set_stripcontrol(&mut self, stripcontrol: bool) {
        self.stripcontrol = stripcontrol;
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.outfp.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.outfp.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.outfp
    }

    /// Write text with encoding and control character handling.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        let text = if self.stripcontrol {
            CONTROL_RE.replace_all(text, "")
        } else {
            Cow::Borrowed(text)
        };
        let encoded = enc(&text).into_owned();
        self.write(&encoded)
    }

    fn write_text_element(&mut self, text: &TextFragment) -> Result<()> {
        self.write(&format!("<text bbox=\"{}\">", bbox2str(text.bbox)))?;
        self.write_text(&text.text)?;
        self.write("</text>\n")
    }

    fn write_rectangle_set<'a, I>(&mut self, rects: I) -> Result<()>
    where
        I: IntoIterator<Item = (Rect, &'a [TextFragment])>,
    {
        self.write(XML_DECL)?;
        self.write("<rectangles>\n")?;
        for (bbox, texts) in rects {
            if texts.is_empty() {
                self.write(&format!("<rectangle bbox=\"{}\" />\n", bbox2str(bbox)))?;
                continue;
            }
            self.write(&format!("<rectangle bbox=\"{}\">\n", bbox2str(bbox)))?;
            for text in texts {
                self.write_text_element(text)?;
            }
            self.write("</rectangle>\n")?;
        }
        self.write("</rectangles>\n")
    }

    /// Write merged regions (shared regions included) as a rectangle set.
    pub fn write_regions(&mut self, regions: &[MergedRegion]) -> Result<()> {
        self.write_rectangle_set(regions.iter().map(|r| (r.bbox, r.texts.as_slice())))
    }

    /// Write text-mapped rectangles as a rectangle set.
    pub fn write_mapped(&mut self, rects: &[MappedRectangle]) -> Result<()> {
        self.write_rectangle_set(rects.iter().map(|r| (r.bbox, r.texts.as_slice())))
    }

    /// Write intersection points in sorted order.
    pub fn write_intersections(&mut self, points: &IntersectionSet) -> Result<()> {
        self.write(XML_DECL)?;
        self.write("<intersections>\n")?;
        for (x, y) in points.iter() {
            self.write(&format!("<point x=\"{:.3}\" y=\"{:.3}\" />\n", x, y))?;
        }
        self.write("</intersections>\n")
    }

    /// Write the structured document tree.
    pub fn write_document(&mut self, doc: &Document) -> Result<()> {
        self.write(XML_DECL)?;
        self.write_node(doc, doc.root())
    }

    fn write_node(&mut self, doc: &Document, id: NodeId) -> Result<()> {
        let node = doc.node(id);
        let tag = node.kind.tag();

        let mut open = format!("<{tag}");
        if let Some(node_id) = &node.id {
            open.push_str(&format!(" id=\"{}\"", enc(node_id)));
        }
        if let Some(bbox) = node.bbox {
            open.push_str(&format!(" bbox=\"{}\"", bbox2str(bbox)));
        }

        let children = node.children();
        match (&node.text, children.is_empty()) {
            (None, true) => self.write(&format!("{open} />\n")),
            (text, _) => {
                self.write(&format!("{open}>"))?;
                if let Some(text) = text {
                    self.write_text(text)?;
                }
                if !children.is_empty() {
                    self.write("\n")?;
                    for &child in children {
                        self.write_node(doc, child)?;
                    }
                }
                self.write(&format!("</{tag}>\n"))
            }
        }
    }
}

fn render(f: impl FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>, stripcontrol: bool) -> Result<String> {
    let mut writer = XmlWriter::with_options(Vec::new(), stripcontrol);
    f(&mut writer)?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Render merged regions to a string.
pub fn regions_to_string(regions: &[MergedRegion], stripcontrol: bool) -> Result<String> {
    render(|w| w.write_regions(regions), stripcontrol)
}

/// Render intersection points to a string.
pub fn intersections_to_string(points: &IntersectionSet) -> Result<String> {
    render(|w| w.write_intersections(points), false)
}

/// Render a structured document to a string.
pub fn document_to_string(doc: &Document, stripcontrol: bool) -> Result<String> {
    render(|w| w.write_document(doc), stripcontrol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::RegionKind;
    use crate::structure::NodeKind;

    #[test]
    fn test_regions_snapshot() {
        let regions = vec![
            MergedRegion {
                bbox: (0.0, 0.0, 100.0, 50.0),
                texts: vec![TextFragment::new((10.0, 10.0, 20.0, 20.0), "A & <B>", 1)],
                kind: RegionKind::Merged,
            },
            MergedRegion {
                bbox: (200.0, 0.0, 300.5, 50.25),
                texts: vec![],
                kind: RegionKind::Merged,
            },
        ];
        let xml = regions_to_string(&regions, false).unwrap();
        insta::assert_snapshot!(xml, @r#"
        <?xml version="1.0" encoding="utf-8" ?>
        <rectangles>
        <rectangle bbox="0.000,0.000,100.000,50.000">
        <text bbox="10.000,10.000,20.000,20.000">A &amp; &lt;B&gt;</text>
        </rectangle>
        <rectangle bbox="200.000,0.000,300.500,50.250" />
        </rectangles>
        "#);
    }

    #[test]
    fn test_strip_control() {
        let regions = vec![MergedRegion {
            bbox: (0.0, 0.0, 1.0, 1.0),
            texts: vec![TextFragment::new((0.0, 0.0, 1.0, 1.0), "a\u{1}b", 1)],
            kind: RegionKind::Merged,
        }];
        assert!(regions_to_string(&regions, true).unwrap().contains(">ab</text>"));
        assert!(regions_to_string(&regions, false).unwrap().contains("a\u{1}b"));
    }

    #[test]
    fn test_intersections_sorted() {
        let points: IntersectionSet = [(100.0, 0.0), (0.0, 50.0), (0.0, 0.0)].into_iter().collect();
        let xml = intersections_to_string(&points).unwrap();
        insta::assert_snapshot!(xml, @r#"
        <?xml version="1.0" encoding="utf-8" ?>
        <intersections>
        <point x="0.000" y="0.000" />
        <point x="0.000" y="50.000" />
        <point x="100.000" y="0.000" />
        </intersections>
        "#);
    }

    #[test]
    fn test_document_snapshot() {
        let mut doc = Document::new();
        let root = doc.root();
        let table = doc.append(root, NodeKind::Table, Some((0.0, 0.0, 100.0, 40.0)), None);
        doc.node_mut(table).id = Some("t0".into());
        doc.append(table, NodeKind::Header, Some((5.0, 30.0, 60.0, 38.0)), Some("PARTS".into()));
        let row = doc.append(table, NodeKind::Row, Some((0.0, 0.0, 100.0, 20.0)), None);
        doc.node_mut(row).id = Some("t0_r0".into());
        let col = doc.append(row, NodeKind::Column, Some((0.0, 0.0, 100.0, 20.0)), None);
        doc.node_mut(col).id = Some("t0_r0_c0".into());
        doc.append_text(col, &TextFragment::new((5.0, 5.0, 50.0, 15.0), "BOLT", 1));
        doc.append(root, NodeKind::TitleBlock, Some((800.0, 900.0, 980.0, 950.0)), None);

        let xml = document_to_string(&doc, false).unwrap();
        insta::assert_snapshot!(xml, @r#"
        <?xml version="1.0" encoding="utf-8" ?>
        <document>
        <table id="t0" bbox="0.000,0.000,100.000,40.000">
        <header bbox="5.000,30.000,60.000,38.000">PARTS</header>
        <row id="t0_r0" bbox="0.000,0.000,100.000,20.000">
        <column id="t0_r0_c0" bbox="0.000,0.000,100.000,20.000">
        <text bbox="5.000,5.000,50.000,15.000">BOLT</text>
        </column>
        </row>
        </table>
        <titleblock bbox="800.000,900.000,980.000,950.000" />
        </document>
        "#);
    }
}
