use unicode_width::UnicodeWidthStr;

use crate::color::{color_for, ANSI_RESET};
use crate::models::BookRow;

pub const DISPLAY_COLUMNS: [&str; 7] = [
    "title",
    "author",
    "genre",
    "pages",
    "published_date",
    "started_reading",
    "finished_reading",
];

const MAX_CELL_WIDTH: usize = 40;

/// The display projection of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: String,
    pub pages: Option<u64>,
    pub published_date: Option<String>,
    pub started_reading: Option<String>,
    pub finished_reading: Option<String>,
}

impl TableRow {
    fn cells(&self) -> [String; 7] {
        [
            self.title.clone().unwrap_or_default(),
            self.author.clone().unwrap_or_default(),
            self.genre.clone(),
            self.pages.map(|pages| pages.to_string()).unwrap_or_default(),
            self.published_date.clone().unwrap_or_default(),
            self.started_reading.clone().unwrap_or_default(),
            self.finished_reading.clone().unwrap_or_default(),
        ]
    }
}

impl From<&BookRow> for TableRow {
    fn from(row: &BookRow) -> Self {
        Self {
            title: row.title.clone(),
            author: row.author.clone(),
            genre: row.genre.clone(),
            pages: row.pages,
            published_date: row.published_date.clone(),
            started_reading: row.started_reading.clone(),
            finished_reading: row.finished_reading.clone(),
        }
    }
}

pub fn build_table(rows: &[&BookRow]) -> Vec<TableRow> {
    rows.iter().map(|row| TableRow::from(*row)).collect()
}

/// Aligned text table. With `ansi`, the genre cell carries its genre color.
pub fn render_table(rows: &[&BookRow], ansi: bool) -> String {
    let table = build_table(rows);
    let body: Vec<[String; 7]> = table
        .iter()
        .map(|row| row.cells().map(|cell| truncate(&cell, MAX_CELL_WIDTH)))
        .collect();

    let mut widths = DISPLAY_COLUMNS.map(|name| name.width());
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells.iter()) {
            *width = (*width).max(cell.width());
        }
    }

    let mut out = String::new();
    let header = DISPLAY_COLUMNS.map(|name| name.to_string());
    push_line(&mut out, &header, &widths, None);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(rule.join("-+-").as_str());
    out.push('\n');

    for (row, cells) in table.iter().zip(body.iter()) {
        let shade = ansi.then(|| row.genre.as_str());
        push_line(&mut out, cells, &widths, shade);
    }
    out
}

fn push_line(out: &mut String, cells: &[String; 7], widths: &[usize; 7], shade: Option<&str>) {
    let mut parts = Vec::with_capacity(cells.len());
    for (index, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        let padded = format!("{}{}", cell, " ".repeat(width.saturating_sub(cell.width())));
        match shade {
            Some(genre) if index == 2 => {
                let color = color_for(Some(genre));
                parts.push(format!(
                    "{}{}{}{}",
                    color.ansi_background(),
                    color.contrasting_text().ansi_foreground(),
                    padded,
                    ANSI_RESET
                ));
            }
            _ => parts.push(padded),
        }
    }
    out.push_str(parts.join(" | ").trim_end());
    out.push('\n');
}

fn truncate(value: &str, max_width: usize) -> String {
    if value.width() <= max_width {
        return value.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in value.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width + 1 > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push('…');
    out
}
