use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod gallery;
pub mod models;
pub mod normalize;
pub mod query;
pub mod session;
pub mod snapshot;
pub mod table;

pub use color::{color_for, GenreColorMap, Rgb};
pub use config::ExplorerConfig;
pub use error::{ExplorerError, ExportError, FetchError};
pub use fetcher::{fetch_all, HttpPageSource, PageSource};
pub use models::{BookRow, ExportFormat, RawBook, SortKey, ViewMode};
pub use normalize::normalize;
pub use query::{apply, ViewQuery};
pub use session::{Control, Reply, Session};
pub use snapshot::{BookCache, Snapshot};

#[derive(Parser, Debug)]
#[command(name = "fable-explorer", author, version, about = "Browse and analyze books from a Fable reading list")]
struct Cli {
  /// JSON config file (base_url, user_agent, timeout_secs)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Override the first page URL of the reading list
  #[arg(long, global = true)]
  base_url: Option<String>,

  /// Override the User-Agent header
  #[arg(long, global = true)]
  user_agent: Option<String>,

  /// Override the HTTP timeout in seconds
  #[arg(long, global = true)]
  timeout_secs: Option<u64>,

  /// Disable terminal colors
  #[arg(long, global = true)]
  no_color: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch the list and print it as a table or gallery
  List {
    #[command(flatten)]
    filter: FilterArgs,
    /// table or gallery
    #[arg(long, default_value = "table")]
    view: ViewMode,
  },
  /// Print the genres of the list with their colors
  Genres,
  /// Fetch the list and export the filtered view
  Export {
    #[command(flatten)]
    filter: FilterArgs,
    /// csv, xlsx or html
    #[arg(long, default_value = "csv")]
    format: ExportFormat,
    /// Output file; defaults to fable_books.<format>
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Interactive session with a cached list
  Shell,
}

#[derive(Args, Debug)]
struct FilterArgs {
  /// Case-insensitive text matched against title or author
  #[arg(short, long, default_value = "")]
  search: String,
  /// Keep only these genres (repeatable)
  #[arg(short, long = "genre")]
  genres: Vec<String>,
  /// title, author, published_date or finished_reading
  #[arg(long, default_value = "title")]
  sort: SortKey,
  /// Sort descending
  #[arg(long)]
  desc: bool,
}

impl FilterArgs {
  fn into_query(self) -> ViewQuery {
    ViewQuery {
      search: self.search,
      genres: self.genres.into_iter().collect(),
      sort_key: self.sort,
      ascending: !self.desc,
    }
  }
}

pub fn run() {
  init_logging();
  if let Err(err) = run_cli(Cli::parse()) {
    eprintln!("{err:?}");
    std::process::exit(1);
  }
}

fn init_logging() {
  use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

  // The fmt layer also receives `log` records through its tracing-log bridge.
  let _ = tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| "fable_explorer=info".into()),
    ))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .try_init();
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
  let mut config = ExplorerConfig::load(cli.config.as_deref()).context("load configuration")?;
  if let Some(base_url) = cli.base_url {
    config.base_url = base_url;
  }
  if let Some(user_agent) = cli.user_agent {
    config.user_agent = user_agent;
  }
  if let Some(timeout_secs) = cli.timeout_secs {
    config.timeout_secs = timeout_secs;
  }
  config.normalize();
  log::debug!("using base_url={} timeout={}s", config.base_url, config.timeout_secs);

  let source = HttpPageSource::new(&config).context("build http client")?;
  let mut session = Session::new(BookCache::new(source, config.base_url.clone()));
  session.ansi = !cli.no_color;

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  match cli.command {
    Command::List { filter, view } => {
      let snapshot = session.fetch().context("fetch books from Fable")?;
      session.query = filter.into_query();
      session.view_mode = view;
      writeln!(out, "Fetched {} books successfully!", snapshot.len())?;
      write!(out, "{}", session.render_view(&snapshot))?;
    }
    Command::Genres => {
      let snapshot = session.fetch().context("fetch books from Fable")?;
      let rows: Vec<&BookRow> = snapshot.rows().iter().collect();
      write!(out, "{}", gallery::render_legend(&rows, session.ansi))?;
    }
    Command::Export { filter, format, output } => {
      let snapshot = session.fetch().context("fetch books from Fable")?;
      let view = apply(snapshot.rows(), &filter.into_query());
      let path = output.unwrap_or_else(|| PathBuf::from(format.default_file_name()));
      export::write_to_path(format, &view, &path)
        .with_context(|| format!("export {} to {}", format, path.display()))?;
      writeln!(out, "Exported {} books to {}", view.len(), path.display())?;
    }
    Command::Shell => {
      drop(out);
      run_shell(&mut session)?;
    }
  }
  Ok(())
}

fn run_shell<S: PageSource>(session: &mut Session<S>) -> anyhow::Result<()> {
  let stdin = std::io::stdin();
  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  writeln!(out, "Type `fetch` to load the reading list, `help` for commands.")?;

  for line in stdin.lock().lines() {
    let line = line.context("read command")?;
    if line.trim().is_empty() {
      continue;
    }
    let control = match line.parse::<Control>() {
      Ok(control) => control,
      Err(message) => {
        writeln!(out, "{}", message)?;
        continue;
      }
    };
    match session.handle(control) {
      Ok(Reply::Text(text)) => writeln!(out, "{}", text)?,
      Ok(Reply::Quit) => break,
      // A failed action leaves the session usable; retry is up to the user.
      Err(err) => writeln!(out, "error: {}", err)?,
    }
    out.flush()?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_parses_list_filters() {
    let cli = Cli::try_parse_from([
      "fable-explorer",
      "--no-color",
      "list",
      "--search",
      "dune",
      "-g",
      "Fantasy",
      "-g",
      "Science Fiction",
      "--sort",
      "finished_reading",
      "--desc",
      "--view",
      "gallery",
    ])
    .unwrap();
    assert!(cli.no_color);
    match cli.command {
      Command::List { filter, view } => {
        assert_eq!(view, ViewMode::Gallery);
        let query = filter.into_query();
        assert_eq!(query.search, "dune");
        assert_eq!(query.genres.len(), 2);
        assert_eq!(query.sort_key, SortKey::FinishedReading);
        assert!(!query.ascending);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn cli_parses_export_defaults() {
    let cli = Cli::try_parse_from(["fable-explorer", "export", "--format", "xlsx"]).unwrap();
    match cli.command {
      Command::Export { filter, format, output } => {
        assert_eq!(format, ExportFormat::Xlsx);
        assert_eq!(output, None);
        assert_eq!(filter.into_query(), ViewQuery::default());
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn cli_rejects_unknown_sort_key() {
    assert!(Cli::try_parse_from(["fable-explorer", "list", "--sort", "pages"]).is_err());
  }
}
