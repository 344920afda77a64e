use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::{HarvestError, Result};

/// Which fetch collaborator turns a keyword into tweets.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchBackend {
    /// Render the live search page through Browserless, then rehydrate ids.
    Browserless {
        base_url: String,
        token: Option<String>,
    },
    /// Run the Apify tweet-scraper actor.
    Apify { api_key: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub search_backend: SearchBackend,

    /// Token for the public tweet syndication endpoint used during rehydration.
    pub syndication_token: String,

    /// Docker image that answers timemap lookups.
    pub memgator_image: String,

    /// Overrides the built-in topic pool when set.
    pub topics: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. `from_env` is this over
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| HarvestError::Config(format!("{key} environment variable is required")))
        };

        let search_backend = match lookup("SEARCH_BACKEND").as_deref() {
            None | Some("browserless") => SearchBackend::Browserless {
                base_url: required("BROWSERLESS_URL")?,
                token: lookup("BROWSERLESS_TOKEN").filter(|t| !t.is_empty()),
            },
            Some("apify") => SearchBackend::Apify {
                api_key: required("APIFY_API_KEY")?,
            },
            Some(other) => {
                return Err(HarvestError::Config(format!(
                    "SEARCH_BACKEND must be 'browserless' or 'apify', got '{other}'"
                )))
            }
        };

        let topics = lookup("TOPICS").map(|raw| {
            raw.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(Self {
            data_dir: PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            search_backend,
            syndication_token: lookup("SYNDICATION_TOKEN")
                .unwrap_or_else(|| "418g769m7fi".to_string()),
            memgator_image: lookup("MEMGATOR_IMAGE")
                .unwrap_or_else(|| "oduwsdl/memgator".to_string()),
            topics: topics.filter(|t| !t.is_empty()),
        })
    }

    /// Log the loaded configuration with secrets masked.
    pub fn log_redacted(&self) {
        let backend = match &self.search_backend {
            SearchBackend::Browserless { base_url, token } => format!(
                "browserless({base_url}, token={})",
                if token.is_some() { "***" } else { "none" }
            ),
            SearchBackend::Apify { .. } => "apify(api_key=***)".to_string(),
        };
        info!(
            data_dir = %self.data_dir.display(),
            backend = backend.as_str(),
            memgator_image = self.memgator_image.as_str(),
            topics = self.topics.as_ref().map(|t| t.len()).unwrap_or(0),
            "Config loaded"
        );
    }
}
