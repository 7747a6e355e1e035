//! End-to-end runs from pdfminer XML to structured documents.

use drawgrid_core::converter::{document_to_string, intersections_to_string, regions_to_string};
use drawgrid_core::input::{read_intersections, read_pages, read_rectangles};
use drawgrid_core::structure::NodeKind;
use drawgrid_core::{LayoutParams, process_pages, structure_page};

fn textbox(id: usize, bbox: &str, word: &str) -> String {
    format!(
        "<textbox id=\"{id}\" bbox=\"{bbox}\">\n<textline bbox=\"{bbox}\">\n\
         <text font=\"Arial\" bbox=\"{bbox}\" size=\"10.000\">{word}</text>\n<text>\n</text>\n\
         </textline>\n</textbox>\n"
    )
}

/// A 2×2 parts table, a one-cell titleblock against the frame, and the
/// frame's bottom and right lines.
fn drawing() -> String {
    let lines = [
        "100.000,100.000,300.000,100.000",
        "100.000,130.000,300.000,130.000",
        "100.000,160.000,300.000,160.000",
        "100.000,100.000,100.000,160.000",
        "200.000,100.000,200.000,160.000",
        "300.000,100.000,300.000,160.000",
        "900.000,30.000,900.000,80.000",
        "900.000,80.000,1150.000,80.000",
        "30.000,30.000,1150.000,30.000",
        "1150.000,30.000,1150.000,800.000",
    ];
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n<pages>\n\
         <page id=\"1\" bbox=\"0.000,0.000,1190.000,842.000\" rotate=\"0\">\n",
    );
    xml.push_str(&textbox(0, "105.000,135.000,150.000,150.000", "ITEM"));
    xml.push_str(&textbox(1, "205.000,135.000,250.000,150.000", "PART"));
    xml.push_str(&textbox(2, "105.000,105.000,115.000,120.000", "1"));
    xml.push_str(&textbox(3, "205.000,105.000,250.000,120.000", "BOLT"));
    xml.push_str(&textbox(4, "910.000,40.000,990.000,50.000", "SCALE 1:1"));
    for bbox in lines {
        xml.push_str(&format!("<line linewidth=\"1\" bbox=\"{bbox}\" />\n"));
    }
    xml.push_str("</page>\n</pages>\n");
    xml
}

#[test]
fn test_full_run() {
    let pages = read_pages(&drawing()).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].texts.len(), 5);

    let run = process_pages(&pages, &LayoutParams::default(), true, Some(1)).unwrap();
    let stats = &run.stats;
    assert_eq!((stats.h_lines, stats.v_lines), (5, 5));
    assert_eq!(stats.intersections, 13);
    assert_eq!(stats.rect_init, 2);
    assert_eq!(stats.rect_merged, 2);
    assert_eq!(stats.tables, 1);
    assert_eq!(stats.titleblocks, 1);
    assert_eq!(stats.pages_failed, 0);
    assert_eq!(stats.summary().avg_rows, 2.0);

    let page = &run.pages[0];
    let doc = &page.structure.as_ref().unwrap().document;
    let table = doc.children_of_kind(doc.root(), NodeKind::Table)[0];
    let first_row = doc.children_of_kind(table, NodeKind::Row)[0];
    let words: Vec<&str> = doc
        .children(first_row)
        .iter()
        .map(|&c| doc.text_of(doc.children(c)[0]))
        .collect();
    assert_eq!(words, vec!["ITEM", "PART"]);

    let xml = document_to_string(doc, false).unwrap();
    assert!(xml.contains("<titleblock bbox=\"900.000,30.000,1150.000,80.000\">"));
    assert!(xml.contains(">SCALE 1:1</text>"));
}

#[test]
fn test_structure_from_saved_layout() {
    let pages = read_pages(&drawing()).unwrap();
    let params = LayoutParams::default();
    let run = process_pages(&pages, &params, false, Some(1)).unwrap();
    let layout = &run.pages[0].layout;
    assert!(run.pages[0].structure.is_none());

    let rect_xml = regions_to_string(layout.regions(), false).unwrap();
    let point_xml = intersections_to_string(&layout.intersections).unwrap();
    let regions = read_rectangles(&rect_xml, 1).unwrap();
    let points = read_intersections(&point_xml).unwrap();
    assert_eq!(points, layout.intersections);
    assert_eq!(regions.len(), layout.regions().len());

    let saved = structure_page(&pages[0], &regions, &points, &params).unwrap();
    let direct = structure_page(&pages[0], layout.regions(), &layout.intersections, &params).unwrap();
    assert_eq!(saved.report, direct.report);
    assert_eq!(
        document_to_string(&saved.document, false).unwrap(),
        document_to_string(&direct.document, false).unwrap()
    );
}
