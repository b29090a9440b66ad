use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{cells, Cell, COLUMNS};
use crate::color::{GenreColorMap, Rgb};
use crate::error::ExportError;
use crate::models::BookRow;

pub const SHEET_NAME: &str = "Books";

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const HEADER_STYLE: usize = 1;
const FIRST_FILL_STYLE: usize = 2;
// Fill ids 0 and 1 are reserved by the format (none, gray125).
const FIRST_FILL_ID: usize = 2;

/// Single-sheet workbook where every cell of a data row is filled with the
/// row's genre color.
pub fn render_xlsx(rows: &[&BookRow]) -> Result<Vec<u8>, ExportError> {
    let colors = GenreColorMap::from_rows(rows.iter().copied());
    render_xlsx_with(rows, &colors)
}

/// As [`render_xlsx`], with colors taken from `colors`. Genres missing from
/// the map are filled white.
pub fn render_xlsx_with(rows: &[&BookRow], colors: &GenreColorMap) -> Result<Vec<u8>, ExportError> {
    let plan = StylePlan::new(rows, colors);

    let parts: [(&str, Vec<u8>); 6] = [
        ("[Content_Types].xml", content_types_xml()?),
        ("_rels/.rels", root_rels_xml()?),
        ("xl/workbook.xml", workbook_xml()?),
        ("xl/_rels/workbook.xml.rels", workbook_rels_xml()?),
        ("xl/styles.xml", styles_xml(&plan.fills)?),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows, &plan.row_styles)?),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(&body)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Distinct fill colors and the cell style of each data row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StylePlan {
    fills: Vec<Rgb>,
    row_styles: Vec<usize>,
}

impl StylePlan {
    fn new(rows: &[&BookRow], colors: &GenreColorMap) -> Self {
        let mut fills: Vec<Rgb> = Vec::new();
        let mut row_styles = Vec::with_capacity(rows.len());
        for row in rows {
            let color = colors.get(&row.genre).unwrap_or_else(|| {
                log::warn!("no color for genre \"{}\", filling white", row.genre);
                Rgb::WHITE
            });
            let position = match fills.iter().position(|fill| *fill == color) {
                Some(position) => position,
                None => {
                    fills.push(color);
                    fills.len() - 1
                }
            };
            row_styles.push(FIRST_FILL_STYLE + position);
        }
        StylePlan { fills, row_styles }
    }
}

struct XmlPart {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlPart {
    fn new() -> Result<Self, ExportError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name).with_attributes(attrs.iter().copied())))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ExportError> {
        self.writer
            .write_event(Event::Empty(BytesStart::new(name).with_attributes(attrs.iter().copied())))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), ExportError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), ExportError> {
        let text = xml_safe(text);
        self.writer.write_event(Event::Text(BytesText::new(&text)))?;
        Ok(())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

fn content_types_xml() -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open(
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    xml.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for (part, content_type) in [
        ("/xl/workbook.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"),
        ("/xl/worksheets/sheet1.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"),
        ("/xl/styles.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"),
    ] {
        xml.empty("Override", &[("PartName", part), ("ContentType", content_type)])?;
    }
    xml.close("Types")?;
    Ok(xml.into_bytes())
}

fn root_rels_xml() -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("Relationships", &[("xmlns", PKG_REL_NS)])?;
    xml.empty(
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument"),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    xml.close("Relationships")?;
    Ok(xml.into_bytes())
}

fn workbook_xml() -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("workbook", &[("xmlns", MAIN_NS), ("xmlns:r", REL_NS)])?;
    xml.open("sheets", &[])?;
    xml.empty("sheet", &[("name", SHEET_NAME), ("sheetId", "1"), ("r:id", "rId1")])?;
    xml.close("sheets")?;
    xml.close("workbook")?;
    Ok(xml.into_bytes())
}

fn workbook_rels_xml() -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("Relationships", &[("xmlns", PKG_REL_NS)])?;
    xml.empty(
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet"),
            ("Target", "worksheets/sheet1.xml"),
        ],
    )?;
    xml.empty(
        "Relationship",
        &[
            ("Id", "rId2"),
            ("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles"),
            ("Target", "styles.xml"),
        ],
    )?;
    xml.close("Relationships")?;
    Ok(xml.into_bytes())
}

fn styles_xml(fills: &[Rgb]) -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("styleSheet", &[("xmlns", MAIN_NS)])?;

    xml.open("fonts", &[("count", "2")])?;
    xml.open("font", &[])?;
    xml.empty("sz", &[("val", "11")])?;
    xml.empty("name", &[("val", "Calibri")])?;
    xml.close("font")?;
    xml.open("font", &[])?;
    xml.empty("b", &[])?;
    xml.empty("sz", &[("val", "11")])?;
    xml.empty("name", &[("val", "Calibri")])?;
    xml.close("font")?;
    xml.close("fonts")?;

    let fill_count = (FIRST_FILL_ID + fills.len()).to_string();
    xml.open("fills", &[("count", &fill_count)])?;
    for pattern in ["none", "gray125"] {
        xml.open("fill", &[])?;
        xml.empty("patternFill", &[("patternType", pattern)])?;
        xml.close("fill")?;
    }
    for fill in fills {
        let argb = fill.argb();
        xml.open("fill", &[])?;
        xml.open("patternFill", &[("patternType", "solid")])?;
        xml.empty("fgColor", &[("rgb", &argb)])?;
        xml.empty("bgColor", &[("indexed", "64")])?;
        xml.close("patternFill")?;
        xml.close("fill")?;
    }
    xml.close("fills")?;

    xml.open("borders", &[("count", "1")])?;
    xml.open("border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        xml.empty(side, &[])?;
    }
    xml.close("border")?;
    xml.close("borders")?;

    xml.open("cellStyleXfs", &[("count", "1")])?;
    xml.empty("xf", &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")])?;
    xml.close("cellStyleXfs")?;

    let xf_count = (FIRST_FILL_STYLE + fills.len()).to_string();
    xml.open("cellXfs", &[("count", &xf_count)])?;
    xml.empty(
        "xf",
        &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0"), ("xfId", "0")],
    )?;
    xml.empty(
        "xf",
        &[
            ("numFmtId", "0"),
            ("fontId", "1"),
            ("fillId", "0"),
            ("borderId", "0"),
            ("xfId", "0"),
            ("applyFont", "1"),
        ],
    )?;
    for index in 0..fills.len() {
        let fill_id = (FIRST_FILL_ID + index).to_string();
        xml.empty(
            "xf",
            &[
                ("numFmtId", "0"),
                ("fontId", "0"),
                ("fillId", &fill_id),
                ("borderId", "0"),
                ("xfId", "0"),
                ("applyFill", "1"),
            ],
        )?;
    }
    xml.close("cellXfs")?;

    xml.open("cellStyles", &[("count", "1")])?;
    xml.empty("cellStyle", &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")])?;
    xml.close("cellStyles")?;

    xml.close("styleSheet")?;
    Ok(xml.into_bytes())
}

fn sheet_xml(rows: &[&BookRow], row_styles: &[usize]) -> Result<Vec<u8>, ExportError> {
    let mut xml = XmlPart::new()?;
    xml.open("worksheet", &[("xmlns", MAIN_NS)])?;
    xml.open("sheetData", &[])?;

    let header: Vec<Cell> = COLUMNS.iter().map(|name| Cell::Text(name.to_string())).collect();
    write_row(&mut xml, 1, &header, HEADER_STYLE)?;
    for (index, (row, style)) in rows.iter().zip(row_styles.iter()).enumerate() {
        write_row(&mut xml, index + 2, &cells(row), *style)?;
    }

    xml.close("sheetData")?;
    xml.close("worksheet")?;
    Ok(xml.into_bytes())
}

/// Drops characters XML 1.0 cannot carry (C0 controls other than tab, LF, CR).
fn xml_safe(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| {
        !matches!(
            c,
            '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
        )
    };
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| allowed(*c)).collect())
    }
}

fn write_row(xml: &mut XmlPart, number: usize, cells: &[Cell], style: usize) -> Result<(), ExportError> {
    let row_ref = number.to_string();
    let style = style.to_string();
    xml.open("row", &[("r", &row_ref)])?;
    for (column, cell) in cells.iter().enumerate() {
        let cell_ref = format!("{}{}", column_name(column), number);
        match cell {
            Cell::Text(text) => {
                xml.open("c", &[("r", &cell_ref), ("s", &style), ("t", "inlineStr")])?;
                xml.open("is", &[])?;
                xml.open("t", &[("xml:space", "preserve")])?;
                xml.text(text)?;
                xml.close("t")?;
                xml.close("is")?;
                xml.close("c")?;
            }
            Cell::Number(value) => {
                xml.open("c", &[("r", &cell_ref), ("s", &style)])?;
                xml.open("v", &[])?;
                xml.text(&value.to_string())?;
                xml.close("v")?;
                xml.close("c")?;
            }
            // Still written so the fill covers the whole row.
            Cell::Empty => xml.empty("c", &[("r", &cell_ref), ("s", &style)])?,
        }
    }
    xml.close("row")
}

/// Zero-based column index to its spreadsheet letters (0 → A, 26 → AA).
fn column_name(index: usize) -> String {
    let mut name = Vec::new();
    let mut value = index + 1;
    while value > 0 {
        let rem = (value - 1) % 26;
        name.push(b'A' + rem as u8);
        value = (value - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::color_for;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }

    fn rows() -> Vec<BookRow> {
        vec![
            BookRow {
                pages: Some(412),
                ..BookRow::sample("Dune", "Science Fiction")
            },
            BookRow::sample("Emma", "Classics"),
            BookRow::sample("Hyperion", "Science Fiction"),
        ]
    }

    #[test]
    fn column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(12), "M");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
    }

    #[test]
    fn one_style_per_distinct_color() {
        let rows = rows();
        let refs: Vec<&BookRow> = rows.iter().collect();
        let colors = GenreColorMap::from_rows(refs.iter().copied());
        let plan = StylePlan::new(&refs, &colors);
        assert_eq!(
            plan.fills,
            vec![color_for(Some("Science Fiction")), color_for(Some("Classics"))]
        );
        assert_eq!(plan.row_styles, vec![2, 3, 2]);
    }

    #[test]
    fn missing_color_falls_back_to_white() {
        let rows = rows();
        let refs: Vec<&BookRow> = rows.iter().collect();
        let plan = StylePlan::new(&refs, &GenreColorMap::default());
        assert_eq!(plan.fills, vec![Rgb::WHITE]);
        assert_eq!(plan.row_styles, vec![2, 2, 2]);

        let bytes = render_xlsx_with(&refs, &GenreColorMap::default()).unwrap();
        assert!(read_part(&bytes, "xl/styles.xml").contains("rgb=\"FFFFFFFF\""));
    }

    #[test]
    fn workbook_has_books_sheet() {
        let bytes = render_xlsx(&[]).unwrap();
        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains("<sheet name=\"Books\" sheetId=\"1\" r:id=\"rId1\"/>"));
        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains("/xl/worksheets/sheet1.xml"));
        assert!(read_part(&bytes, "_rels/.rels").contains("xl/workbook.xml"));
        assert!(read_part(&bytes, "xl/_rels/workbook.xml.rels").contains("styles.xml"));
    }

    #[test]
    fn every_data_cell_carries_row_fill() {
        let rows = rows();
        let refs: Vec<&BookRow> = rows.iter().collect();
        let bytes = render_xlsx(&refs).unwrap();

        let styles = read_part(&bytes, "xl/styles.xml");
        assert!(styles.contains(&format!("rgb=\"{}\"", color_for(Some("Science Fiction")).argb())));
        assert!(styles.contains(&format!("rgb=\"{}\"", color_for(Some("Classics")).argb())));

        let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(sheet.matches("<row ").count(), 4);
        assert_eq!(sheet.matches("s=\"1\"").count(), COLUMNS.len());
        assert_eq!(sheet.matches("s=\"2\"").count(), 2 * COLUMNS.len());
        assert_eq!(sheet.matches("s=\"3\"").count(), COLUMNS.len());
        assert!(sheet.contains("<c r=\"E2\" s=\"2\"><v>412</v></c>"));
        assert!(sheet.contains("<c r=\"A3\" s=\"3\" t=\"inlineStr\"><is><t xml:space=\"preserve\">Emma</t></is></c>"));
        assert!(sheet.contains("<c r=\"B3\" s=\"3\"/>"));
    }

    #[test]
    fn text_is_escaped() {
        let row = BookRow::sample("Pride & <Prejudice>", "Classics");
        let bytes = render_xlsx(&[&row]).unwrap();
        let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("Pride &amp; &lt;Prejudice&gt;"));
    }

    #[test]
    fn control_characters_are_dropped() {
        let row = BookRow::sample("Back\u{8}space\tTab\nLine", "Classics");
        let bytes = render_xlsx(&[&row]).unwrap();
        let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("Backspace\tTab\nLine"));
        assert!(!sheet.contains('\u{8}'));
    }
}
