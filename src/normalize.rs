use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{BookRow, RawBook, BOOK_URL_BASE, UNKNOWN_GENRE};

/// Flattens one raw API record. Never fails: anything missing or of the
/// wrong shape becomes `None` (or `"Unknown"` for the genre).
pub fn normalize(raw: &RawBook) -> BookRow {
    let finished_reading = text_field(raw, "finished_reading_at");
    let finished_datetime = finished_reading.as_deref().and_then(parse_timestamp);

    BookRow {
        title: text_field(raw, "title"),
        subtitle: text_field(raw, "subtitle"),
        author: first_name(raw, "authors"),
        genre: first_name(raw, "genres").unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
        pages: raw.get("page_count").and_then(|value| value.as_u64()),
        isbn: text_field(raw, "isbn"),
        published_date: text_field(raw, "published_date"),
        imprint: text_field(raw, "imprint"),
        cover_image: text_field(raw, "cover_image"),
        book_url: identifier(raw).map(|id| format!("{}{}", BOOK_URL_BASE, id)),
        started_reading: text_field(raw, "started_reading_at"),
        finished_reading,
        finished_datetime,
    }
}

pub fn normalize_all(raws: &[RawBook]) -> Vec<BookRow> {
    raws.iter().map(normalize).collect()
}

/// Best-effort ISO-8601 parse. A trailing `Z` is UTC; values without an
/// offset are taken as UTC; a bare date is midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let offset_form = match value.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        Some(head) => format!("{}+00:00", head),
        None => value.to_string(),
    };
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%dT%H:%M%z",
    ] {
        if let Ok(parsed) = DateTime::parse_from_str(&offset_form, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    log::debug!("unparseable finished_reading_at value=\"{}\"", value);
    None
}

fn text_field(raw: &RawBook, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
        .and_then(non_empty)
}

fn first_name(raw: &RawBook, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(|value| value.as_array())
        .and_then(|values| values.first())
        .and_then(|entry| entry.get("name"))
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
        .and_then(non_empty)
}

fn identifier(raw: &RawBook) -> Option<String> {
    match raw.get("id")? {
        Value::String(text) => non_empty(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
