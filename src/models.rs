use chrono::{DateTime, Utc};
use serde_json::Value;

pub const UNKNOWN_GENRE: &str = "Unknown";
pub const BOOK_URL_BASE: &str = "https://fable.co/book/";

/// The `book` object of one API result entry, kept untyped until normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBook(Value);

impl RawBook {
    pub fn new(value: Value) -> Self {
        if value.is_object() {
            RawBook(value)
        } else {
            RawBook(Value::Object(Default::default()))
        }
    }

    /// Takes the nested `book` field of a `results` entry; absent becomes empty.
    pub fn from_entry(entry: &Value) -> Self {
        Self::new(entry.get("book").cloned().unwrap_or(Value::Null))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub genre: String,
    pub pages: Option<u64>,
    pub isbn: Option<String>,
    pub published_date: Option<String>,
    pub imprint: Option<String>,
    pub cover_image: Option<String>,
    pub book_url: Option<String>,
    pub started_reading: Option<String>,
    pub finished_reading: Option<String>,
    pub finished_datetime: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl BookRow {
    pub(crate) fn sample(title: &str, genre: &str) -> Self {
        BookRow {
            title: Some(title.to_string()),
            subtitle: None,
            author: None,
            genre: genre.to_string(),
            pages: None,
            isbn: None,
            published_date: None,
            imprint: None,
            cover_image: None,
            book_url: None,
            started_reading: None,
            finished_reading: None,
            finished_datetime: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Title,
    Author,
    PublishedDate,
    FinishedReading,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Title,
        SortKey::Author,
        SortKey::PublishedDate,
        SortKey::FinishedReading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Author => "author",
            SortKey::PublishedDate => "published_date",
            SortKey::FinishedReading => "finished_reading",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortKey::Title),
            "author" => Ok(SortKey::Author),
            "published_date" => Ok(SortKey::PublishedDate),
            "finished_reading" => Ok(SortKey::FinishedReading),
            _ => Err("unknown sort key"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Table,
    Gallery,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Table => "table",
            ViewMode::Gallery => "gallery",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewMode {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(ViewMode::Table),
            "gallery" => Ok(ViewMode::Gallery),
            _ => Err("unknown view mode"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Html,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Html => "html",
        }
    }

    pub fn default_file_name(&self) -> String {
        format!("fable_books.{}", self.as_str())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "html" => Ok(ExportFormat::Html),
            _ => Err("unknown export format"),
        }
    }
}
