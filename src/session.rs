use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ExplorerError;
use crate::export;
use crate::fetcher::PageSource;
use crate::gallery::{render_gallery, render_legend};
use crate::models::{BookRow, ExportFormat, SortKey, ViewMode};
use crate::query::{apply, ViewQuery};
use crate::snapshot::{BookCache, Snapshot};
use crate::table::render_table;

pub const HELP: &str = "\
fetch                       fetch the reading list (cached for this session)
refresh                     refetch, replacing the cached list
search [text]               filter by title or author; no text clears
genre add|remove <name>     toggle a genre in the filter
genre clear                 drop the genre filter
genres                      list the genres available to filter on
sort title|author|published_date|finished_reading
asc | desc                  sort direction
view table|gallery          presentation mode
show                        print the current view
legend                      print the genre colors of the current view
export csv|xlsx|html [path] export the current view
help                        this text
quit                        leave the shell";

/// One user action, parsed from a line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Fetch,
    Refresh,
    Search(String),
    AddGenre(String),
    RemoveGenre(String),
    ClearGenres,
    Genres,
    Sort(SortKey),
    Ascending(bool),
    View(ViewMode),
    Show,
    Legend,
    Export(ExportFormat, Option<PathBuf>),
    Help,
    Quit,
}

impl std::str::FromStr for Control {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command.to_ascii_lowercase().as_str() {
            "fetch" => Ok(Control::Fetch),
            "refresh" => Ok(Control::Refresh),
            "search" => Ok(Control::Search(rest.to_string())),
            "genre" => {
                let (action, name) = match rest.split_once(char::is_whitespace) {
                    Some((action, name)) => (action, name.trim()),
                    None => (rest, ""),
                };
                match action.to_ascii_lowercase().as_str() {
                    "clear" => Ok(Control::ClearGenres),
                    "add" if !name.is_empty() => Ok(Control::AddGenre(name.to_string())),
                    "remove" if !name.is_empty() => Ok(Control::RemoveGenre(name.to_string())),
                    _ => Err("usage: genre add|remove <name> | genre clear".to_string()),
                }
            }
            "genres" => Ok(Control::Genres),
            "sort" => rest
                .parse::<SortKey>()
                .map(Control::Sort)
                .map_err(|err| err.to_string()),
            "asc" => Ok(Control::Ascending(true)),
            "desc" => Ok(Control::Ascending(false)),
            "view" => rest
                .parse::<ViewMode>()
                .map(Control::View)
                .map_err(|err| err.to_string()),
            "show" => Ok(Control::Show),
            "legend" => Ok(Control::Legend),
            "export" => {
                let (format, path) = match rest.split_once(char::is_whitespace) {
                    Some((format, path)) => (format, Some(PathBuf::from(path.trim()))),
                    None => (rest, None),
                };
                let format = format.parse::<ExportFormat>().map_err(|err| err.to_string())?;
                Ok(Control::Export(format, path))
            }
            "help" | "?" => Ok(Control::Help),
            "quit" | "exit" => Ok(Control::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command `{}`, try `help`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// The state behind the user controls: one cached snapshot plus the
/// current filter, sort and presentation choices.
pub struct Session<S> {
    cache: BookCache<S>,
    pub query: ViewQuery,
    pub view_mode: ViewMode,
    pub ansi: bool,
}

impl<S: PageSource> Session<S> {
    pub fn new(cache: BookCache<S>) -> Self {
        Self {
            cache,
            query: ViewQuery::default(),
            view_mode: ViewMode::Table,
            ansi: false,
        }
    }

    pub fn fetch(&self) -> Result<Arc<Snapshot>, ExplorerError> {
        Ok(self.cache.get_or_fetch()?)
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>, ExplorerError> {
        self.cache.current().ok_or(ExplorerError::NoSnapshot)
    }

    pub fn render_view(&self, snapshot: &Snapshot) -> String {
        let view = apply(snapshot.rows(), &self.query);
        render_rows(&view, self.view_mode, self.ansi)
    }

    pub fn handle(&mut self, control: Control) -> Result<Reply, ExplorerError> {
        let text = match control {
            Control::Fetch => {
                let snapshot = self.fetch()?;
                format!("Fetched {} books successfully!", snapshot.len())
            }
            Control::Refresh => {
                let snapshot = self.cache.refresh()?;
                format!("Fetched {} books successfully!", snapshot.len())
            }
            Control::Search(text) => {
                let snapshot = self.snapshot()?;
                self.query.search = text;
                self.render_view(&snapshot)
            }
            Control::AddGenre(genre) => {
                let snapshot = self.snapshot()?;
                self.query.genres.insert(genre);
                self.render_view(&snapshot)
            }
            Control::RemoveGenre(genre) => {
                let snapshot = self.snapshot()?;
                self.query.genres.remove(&genre);
                self.render_view(&snapshot)
            }
            Control::ClearGenres => {
                let snapshot = self.snapshot()?;
                self.query.genres.clear();
                self.render_view(&snapshot)
            }
            Control::Genres => self.snapshot()?.genres().join("\n"),
            Control::Sort(key) => {
                let snapshot = self.snapshot()?;
                self.query.sort_key = key;
                self.render_view(&snapshot)
            }
            Control::Ascending(ascending) => {
                let snapshot = self.snapshot()?;
                self.query.ascending = ascending;
                self.render_view(&snapshot)
            }
            Control::View(mode) => {
                let snapshot = self.snapshot()?;
                self.view_mode = mode;
                self.render_view(&snapshot)
            }
            Control::Show => self.render_view(&*self.snapshot()?),
            Control::Legend => {
                let snapshot = self.snapshot()?;
                render_legend(&apply(snapshot.rows(), &self.query), self.ansi)
            }
            Control::Export(format, path) => {
                let snapshot = self.snapshot()?;
                let view = apply(snapshot.rows(), &self.query);
                let path = path.unwrap_or_else(|| PathBuf::from(format.default_file_name()));
                export::write_to_path(format, &view, &path)?;
                format!("Exported {} books to {}", view.len(), path.display())
            }
            Control::Help => HELP.to_string(),
            Control::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }
}

pub fn render_rows(view: &[&BookRow], mode: ViewMode, ansi: bool) -> String {
    match mode {
        ViewMode::Table => format!("{}\n{}", render_table(view, ansi), render_legend(view, ansi)),
        ViewMode::Gallery => format!("{}{}", render_gallery(view, ansi), render_legend(view, ansi)),
    }
}
