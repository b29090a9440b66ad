use std::path::Path;

use crate::error::ExportError;
use crate::gallery::gallery_html;
use crate::models::{BookRow, ExportFormat};

pub mod csv;
pub mod xlsx;

/// The full row schema, shared by the CSV and spreadsheet exports.
pub const COLUMNS: [&str; 13] = [
    "title",
    "subtitle",
    "author",
    "genre",
    "pages",
    "isbn",
    "published_date",
    "imprint",
    "cover_image",
    "book_url",
    "started_reading",
    "finished_reading",
    "finished_datetime",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Cell {
    Text(String),
    Number(u64),
    Empty,
}

impl Cell {
    fn text(value: &Option<String>) -> Self {
        value.clone().map(Cell::Text).unwrap_or(Cell::Empty)
    }

    pub(crate) fn to_plain(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(number) => number.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

pub(crate) fn cells(row: &BookRow) -> [Cell; 13] {
    [
        Cell::text(&row.title),
        Cell::text(&row.subtitle),
        Cell::text(&row.author),
        Cell::Text(row.genre.clone()),
        row.pages.map(Cell::Number).unwrap_or(Cell::Empty),
        Cell::text(&row.isbn),
        Cell::text(&row.published_date),
        Cell::text(&row.imprint),
        Cell::text(&row.cover_image),
        Cell::text(&row.book_url),
        Cell::text(&row.started_reading),
        Cell::text(&row.finished_reading),
        row.finished_datetime
            .map(|value| Cell::Text(value.to_rfc3339()))
            .unwrap_or(Cell::Empty),
    ]
}

pub fn render(format: ExportFormat, rows: &[&BookRow]) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => Ok(csv::render_csv(rows).into_bytes()),
        ExportFormat::Xlsx => xlsx::render_xlsx(rows),
        ExportFormat::Html => Ok(gallery_html(rows).into_bytes()),
    }
}

/// Writes through a sibling temp file so a failed export never leaves a
/// truncated file behind.
pub fn write_to_path(format: ExportFormat, rows: &[&BookRow], path: &Path) -> Result<(), ExportError> {
    let bytes = render(format, rows)?;
    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    std::fs::write(&temp_path, &bytes)?;
    std::fs::rename(&temp_path, path)?;
    log::info!(
        "exported {} books as {} to {}",
        rows.len(),
        format,
        path.display()
    );
    Ok(())
}
