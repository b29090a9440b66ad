use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::ExplorerError;

pub const DEFAULT_BASE_URL: &str = "https://api.fable.co/api/v2/users/0c031026-9f1f-4a02-889c-79d2bdb11781/book_lists/33f803be-3e8d-4ed6-bd19-79a330d2bb32/books";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_BASE_URL: &str = "FABLE_EXPLORER_BASE_URL";
const ENV_USER_AGENT: &str = "FABLE_EXPLORER_USER_AGENT";
const ENV_TIMEOUT_SECS: &str = "FABLE_EXPLORER_TIMEOUT_SECS";
const ENV_DEBUG: &str = "FABLE_EXPLORER_DEBUG";

static FETCH_DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ExplorerConfig {
    /// Defaults, then the JSON file (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ExplorerError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.normalize();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ExplorerError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|err| ExplorerError::Config(format!("{}: {}", path.display(), err)))
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ExplorerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = lookup(ENV_USER_AGENT) {
            self.user_agent = value;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = value.trim().parse().map_err(|_| {
                ExplorerError::Config(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))
            })?;
        }
        Ok(())
    }

    pub fn normalize(&mut self) {
        self.base_url = self.base_url.trim().to_string();
        if self.base_url.is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_string();
        }
        self.user_agent = self.user_agent.trim().to_string();
        if self.user_agent.is_empty() {
            self.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        self.timeout_secs = self.timeout_secs.clamp(1, 120);
    }
}

pub(crate) fn fetch_debug_enabled() -> bool {
    *FETCH_DEBUG_ENABLED.get_or_init(|| {
        std::env::var(ENV_DEBUG)
            .map(|value| is_truthy(&value))
            .unwrap_or(false)
    })
}

fn is_truthy(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    lowered == "1" || lowered == "true" || lowered == "yes" || lowered == "on"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_reading_list() {
        let config = ExplorerConfig::default();
        assert!(config.base_url.starts_with("https://api.fable.co/api/v2/users/"));
        assert!(config.base_url.ends_with("/books"));
        assert_eq!(config.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ExplorerConfig =
            serde_json::from_str(r#"{ "user_agent": "explorer-test" }"#).unwrap();
        assert_eq!(config.user_agent, "explorer-test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, " https://api.test/books "),
            (ENV_TIMEOUT_SECS, "500"),
        ]
        .into_iter()
        .collect();
        let mut config = ExplorerConfig::default();
        config
            .apply_env(|key| env.get(key).map(|value| value.to_string()))
            .unwrap();
        config.normalize();
        assert_eq!(config.base_url, "https://api.test/books");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn bad_timeout_is_config_error() {
        let mut config = ExplorerConfig::default();
        let err = config
            .apply_env(|key| (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ExplorerError::Config(_)));
    }

    #[test]
    fn normalize_restores_blank_values() {
        let mut config = ExplorerConfig {
            base_url: "  ".to_string(),
            user_agent: String::new(),
            timeout_secs: 0,
        };
        config.normalize();
        assert_eq!(config, ExplorerConfig { timeout_secs: 1, ..ExplorerConfig::default() });
    }

    #[test]
    fn truthy_flags() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" Yes "));
        assert!(is_truthy("ON"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }
}
