use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{BookRow, SortKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    pub genres: BTreeSet<String>,
    pub sort_key: SortKey,
    pub ascending: bool,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            genres: BTreeSet::new(),
            sort_key: SortKey::Title,
            ascending: true,
        }
    }
}

/// Filters then stably sorts `rows` into a new view. `rows` is untouched.
pub fn apply<'a>(rows: &'a [BookRow], query: &ViewQuery) -> Vec<&'a BookRow> {
    let needle = query.search.to_lowercase();
    let mut view: Vec<&BookRow> = rows
        .iter()
        .filter(|row| needle.is_empty() || matches_search(row, &needle))
        .filter(|row| query.genres.is_empty() || query.genres.contains(&row.genre))
        .collect();

    view.sort_by(|a, b| compare_rows(a, b, query.sort_key, query.ascending));
    view
}

fn matches_search(row: &BookRow, needle: &str) -> bool {
    let contains = |field: &Option<String>| {
        field
            .as_deref()
            .map(|value| value.to_lowercase().contains(needle))
            .unwrap_or(false)
    };
    contains(&row.title) || contains(&row.author)
}

fn compare_rows(a: &BookRow, b: &BookRow, key: SortKey, ascending: bool) -> Ordering {
    match key {
        SortKey::Title => missing_last(a.title.as_ref(), b.title.as_ref(), ascending),
        SortKey::Author => missing_last(a.author.as_ref(), b.author.as_ref(), ascending),
        SortKey::PublishedDate => {
            missing_last(a.published_date.as_ref(), b.published_date.as_ref(), ascending)
        }
        SortKey::FinishedReading => missing_last(
            a.finished_datetime.as_ref(),
            b.finished_datetime.as_ref(),
            ascending,
        ),
    }
}

/// Absent values go last whichever the direction; only present values flip.
fn missing_last<T: Ord>(a: Option<&T>, b: Option<&T>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if ascending {
                a.cmp(b)
            } else {
                b.cmp(a)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_timestamp;

    fn book(title: &str, author: Option<&str>, genre: &str) -> BookRow {
        BookRow {
            author: author.map(|value| value.to_string()),
            ..BookRow::sample(title, genre)
        }
    }

    fn finished(title: &str, date: Option<&str>) -> BookRow {
        BookRow {
            finished_reading: date.map(|value| value.to_string()),
            finished_datetime: date.and_then(parse_timestamp),
            ..BookRow::sample(title, "Unknown")
        }
    }

    fn titles(view: &[&BookRow]) -> Vec<String> {
        view.iter()
            .map(|row| row.title.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let rows = vec![
            book("Dune", Some("Herbert"), "Science Fiction"),
            book("Emma", Some("Austen"), "Classics"),
        ];
        let query = ViewQuery {
            search: "du".to_string(),
            ..ViewQuery::default()
        };
        assert_eq!(titles(&apply(&rows, &query)), vec!["Dune"]);
    }

    #[test]
    fn search_matches_author_when_title_absent() {
        let mut anonymous = book("x", Some("Ursula K. Le Guin"), "Fantasy");
        anonymous.title = None;
        let rows = vec![anonymous, book("Guinness Book", None, "Reference")];
        let query = ViewQuery {
            search: "GUIN".to_string(),
            ..ViewQuery::default()
        };
        let view = apply(&rows, &query);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].title.as_deref(), Some("Guinness Book"));
        assert_eq!(view[1].author.as_deref(), Some("Ursula K. Le Guin"));
    }

    #[test]
    fn empty_search_keeps_everything() {
        let rows = vec![book("B", None, "G"), book("A", None, "G")];
        assert_eq!(titles(&apply(&rows, &ViewQuery::default())), vec!["A", "B"]);
    }

    #[test]
    fn search_whitespace_is_significant() {
        let rows = vec![
            book("The Hobbit", Some("Tolkien"), "Fantasy"),
            book("Theodore", Some("Ames"), "Biography"),
        ];
        let query = ViewQuery {
            search: "the ".to_string(),
            ..ViewQuery::default()
        };
        assert_eq!(titles(&apply(&rows, &query)), vec!["The Hobbit"]);

        let query = ViewQuery {
            search: "   ".to_string(),
            ..ViewQuery::default()
        };
        assert!(apply(&rows, &query).is_empty());
    }

    #[test]
    fn genre_filter_is_exact_membership() {
        let rows = vec![
            book("A", None, "Fantasy"),
            book("B", None, "fantasy"),
            book("C", None, "Mystery"),
            book("D", None, "Poetry"),
        ];
        let query = ViewQuery {
            genres: ["Fantasy", "Mystery"].iter().map(|g| g.to_string()).collect(),
            ..ViewQuery::default()
        };
        assert_eq!(titles(&apply(&rows, &query)), vec!["A", "C"]);
    }

    #[test]
    fn finished_sort_puts_missing_last_both_ways() {
        let rows = vec![
            finished("none-0", None),
            finished("2021", Some("2021-01-01")),
            finished("none-2", None),
            finished("2020", Some("2020-06-01")),
        ];
        let mut query = ViewQuery {
            sort_key: SortKey::FinishedReading,
            ..ViewQuery::default()
        };
        assert_eq!(
            titles(&apply(&rows, &query)),
            vec!["2020", "2021", "none-0", "none-2"]
        );

        query.ascending = false;
        assert_eq!(
            titles(&apply(&rows, &query)),
            vec!["2021", "2020", "none-0", "none-2"]
        );
    }

    #[test]
    fn finished_sort_uses_parsed_time_not_text() {
        let rows = vec![
            finished("offset", Some("2021-01-01T00:30:00+02:00")),
            finished("utc", Some("2020-12-31T23:00:00Z")),
        ];
        let query = ViewQuery {
            sort_key: SortKey::FinishedReading,
            ..ViewQuery::default()
        };
        // 00:30+02:00 is 22:30 UTC, before 23:00 UTC.
        assert_eq!(titles(&apply(&rows, &query)), vec!["offset", "utc"]);
    }

    #[test]
    fn ties_keep_fetch_order() {
        let rows = vec![
            book("Same", Some("1"), "G"),
            book("Other", Some("2"), "G"),
            book("Same", Some("3"), "G"),
        ];
        let mut query = ViewQuery::default();
        let authors = |view: Vec<&BookRow>| -> Vec<String> {
            view.iter().map(|row| row.author.clone().unwrap()).collect()
        };
        assert_eq!(authors(apply(&rows, &query)), vec!["2", "1", "3"]);
        query.ascending = false;
        assert_eq!(authors(apply(&rows, &query)), vec!["1", "3", "2"]);
    }

    #[test]
    fn author_sort_places_absent_last() {
        let rows = vec![
            book("A", None, "G"),
            book("B", Some("Zola"), "G"),
            book("C", Some("Austen"), "G"),
        ];
        let mut query = ViewQuery {
            sort_key: SortKey::Author,
            ..ViewQuery::default()
        };
        assert_eq!(titles(&apply(&rows, &query)), vec!["C", "B", "A"]);
        query.ascending = false;
        assert_eq!(titles(&apply(&rows, &query)), vec!["B", "C", "A"]);
    }

    #[test]
    fn published_date_sorts_raw_text() {
        let mut old = book("Old", None, "G");
        old.published_date = Some("1965-08-01".to_string());
        let mut new = book("New", None, "G");
        new.published_date = Some("2019".to_string());
        let rows = vec![new, old];
        let query = ViewQuery {
            sort_key: SortKey::PublishedDate,
            ..ViewQuery::default()
        };
        assert_eq!(titles(&apply(&rows, &query)), vec!["Old", "New"]);
    }

    #[test]
    fn apply_leaves_rows_untouched() {
        let rows = vec![book("B", None, "G"), book("A", None, "G")];
        let before = rows.clone();
        let _ = apply(&rows, &ViewQuery::default());
        assert_eq!(rows, before);
    }
}
