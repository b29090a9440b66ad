use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::{fetch_debug_enabled, ExplorerConfig};
use crate::error::FetchError;
use crate::models::RawBook;

/// One JSON GET. The only HTTP capability the paginator needs.
pub trait PageSource {
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

pub struct HttpPageSource {
    client: Client,
    user_agent: String,
}

impl HttpPageSource {
    pub fn new(config: &ExplorerConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| FetchError::Transport {
                url: config.base_url.clone(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

impl PageSource for HttpPageSource {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let debug_enabled = fetch_debug_enabled();
        if debug_enabled {
            log::info!("[fetch-debug] http start url={}", url);
        }

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .send()
            .map_err(|err| FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("book list request failed url={} status={}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if debug_enabled {
            log::info!("[fetch-debug] http success url={} status={}", url, status);
        }

        response.json::<Value>().map_err(|err| FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

/// Drains every page starting at `base_url`, in page then in-page order.
/// Any failed page fails the whole traversal.
pub fn fetch_all<S: PageSource + ?Sized>(
    source: &S,
    base_url: &str,
) -> Result<Vec<RawBook>, FetchError> {
    let mut books = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(base_url.to_string());
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        if !visited.insert(url.clone()) {
            log::warn!("pagination revisited url={}, stopping", url);
            break;
        }

        let data = source.get_json(&url)?;
        let results = match data.get("results").and_then(|value| value.as_array()) {
            Some(results) if !results.is_empty() => results,
            _ => break,
        };

        pages += 1;
        books.extend(results.iter().map(RawBook::from_entry));
        log::debug!("fetched page={} entries={} total={}", pages, results.len(), books.len());

        next = data
            .get("next")
            .and_then(|value| value.as_str())
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string());
    }

    log::info!("fetched {} books across {} pages", books.len(), pages);
    Ok(books)
}
