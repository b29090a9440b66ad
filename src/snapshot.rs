use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::FetchError;
use crate::fetcher::{fetch_all, PageSource};
use crate::models::BookRow;
use crate::normalize::normalize_all;

/// The rows of one completed fetch. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    rows: Vec<BookRow>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(rows: Vec<BookRow>, fetched_at: DateTime<Utc>) -> Self {
        Self { rows, fetched_at }
    }

    pub fn rows(&self) -> &[BookRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Sorted distinct genres, the options of the genre filter.
    pub fn genres(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.genre.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Caches the one parameterless fetch. Fetches are serialized; the cached
/// snapshot is swapped as a whole so readers never see a partial list.
pub struct BookCache<S> {
    source: S,
    base_url: String,
    slot: RwLock<Option<Arc<Snapshot>>>,
    fetch_lock: Mutex<()>,
}

impl<S: PageSource> BookCache<S> {
    pub fn new(source: S, base_url: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            slot: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn get_or_fetch(&self) -> Result<Arc<Snapshot>, FetchError> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        let _guard = self
            .fetch_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another caller may have filled the slot while we waited.
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        self.fetch_and_publish()
    }

    /// Refetches unconditionally. On failure the previous snapshot stays.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, FetchError> {
        let _guard = self
            .fetch_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.fetch_and_publish()
    }

    pub fn invalidate(&self) {
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn fetch_and_publish(&self) -> Result<Arc<Snapshot>, FetchError> {
        let raws = fetch_all(&self.source, &self.base_url).map_err(|err| {
            log::error!("book fetch failed: {}", err);
            err
        })?;
        let snapshot = Arc::new(Snapshot::new(normalize_all(&raws), Utc::now()));
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&snapshot));
        log::info!("published snapshot with {} books", snapshot.len());
        Ok(snapshot)
    }
}
