use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for X/Twitter keyword search via apidojo/tweet-scraper.
#[derive(Debug, Clone, Serialize)]
pub struct TweetSearchInput {
    #[serde(rename = "searchTerms")]
    pub search_terms: Vec<String>,
    #[serde(rename = "maxItems")]
    pub max_items: u32,
    /// "Latest" matches the live tab of the web search page.
    pub sort: String,
}

impl TweetSearchInput {
    pub fn latest(term: &str, max_items: u32) -> Self {
        Self {
            search_terms: vec![term.to_string()],
            max_items,
            sort: "Latest".to_string(),
        }
    }
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Where a run sits in its lifecycle, collapsed from Apify's status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    Succeeded,
    Failed,
}

impl RunData {
    pub fn phase(&self) -> RunPhase {
        match self.status.as_str() {
            "SUCCEEDED" => RunPhase::Succeeded,
            "FAILED" | "ABORTED" | "TIMED-OUT" => RunPhase::Failed,
            _ => RunPhase::Running,
        }
    }

    /// Wall time of a finished run, when Apify reported both ends.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}
