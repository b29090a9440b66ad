use super::{cells, COLUMNS};
use crate::models::BookRow;

/// UTF-8 CSV of the full schema. Absent values are blank fields.
pub fn render_csv(rows: &[&BookRow]) -> String {
    let mut csv = String::new();
    push_record(&mut csv, COLUMNS.iter().map(|name| name.to_string()));
    for row in rows {
        push_record(&mut csv, cells(row).iter().map(|cell| cell.to_plain()));
    }
    csv
}

fn push_record<I>(csv: &mut String, fields: I)
where
    I: Iterator<Item = String>,
{
    let line = fields
        .map(|field| escape_csv(&field))
        .collect::<Vec<_>>()
        .join(",");
    csv.push_str(&line);
    csv.push('\n');
}

fn escape_csv(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let needs_quotes = value.contains(',')
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');
    if needs_quotes {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}
