//! Keyword search backends. Both return raw tweet JSON ready to be written
//! to a partial file.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use apify_client::ApifyClient;
use async_trait::async_trait;
use browserless_client::{BrowserlessClient, ContentRequest};
use harvest_common::{HarvestError, Result, TweetNotes, TweetRef};
use regex::Regex;
use serde_json::Value;
use tracing::info;

use crate::rehydrate::Rehydrator;

/// Status permalinks in rendered search results, relative or absolute.
static RE_STATUS_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"href\s*=\s*["'](?:https?://(?:www\.)?(?:twitter|x)\.com)?/([A-Za-z0-9_]{1,15})/status/(\d+)"#,
    )
    .expect("valid regex")
});

#[async_trait]
pub trait TweetSearcher: Send + Sync {
    /// Up to `max_tweets` of the latest tweets matching `query`.
    async fn search(&self, query: &str, max_tweets: u32) -> Result<Vec<Value>>;
}

/// The live-results search page for `query`.
pub fn search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("https://twitter.com/search?q={encoded}&f=live&src=typd")
}

/// Distinct tweet refs linked from a results page, in page order, at most `max`.
pub fn parse_status_links(html: &str, max: usize) -> Vec<TweetRef> {
    let mut seen = HashSet::new();
    RE_STATUS_LINK
        .captures_iter(html)
        .filter_map(|caps| {
            let screen_name = caps.get(1)?.as_str();
            let id = caps.get(2)?.as_str();
            seen.insert(id.to_string()).then(|| TweetRef {
                id: id.to_string(),
                screen_name: screen_name.to_string(),
            })
        })
        .take(max)
        .collect()
}

/// Renders the search page in a headless browser and rehydrates the ids
/// found on it.
pub struct BrowserSearcher {
    browserless: BrowserlessClient,
    rehydrator: Rehydrator,
}

impl BrowserSearcher {
    pub fn new(browserless: BrowserlessClient, rehydrator: Rehydrator) -> Self {
        Self {
            browserless,
            rehydrator,
        }
    }
}

#[async_trait]
impl TweetSearcher for BrowserSearcher {
    async fn search(&self, query: &str, max_tweets: u32) -> Result<Vec<Value>> {
        let url = search_url(query);
        let request = ContentRequest::new(&url)
            .wait_for("article", Duration::from_secs(15))
            .network_idle();

        let html = self
            .browserless
            .content_with(&request)
            .await
            .map_err(|e| HarvestError::Fetch(format!("search page for '{query}': {e}")))?;

        let refs = parse_status_links(&html, max_tweets as usize);
        info!(query, found = refs.len(), "Parsed search results page");

        let refs = refs
            .into_iter()
            .map(|r| {
                let notes = TweetNotes {
                    timeline_screen_name: r.screen_name.clone(),
                    is_retweet: false,
                };
                (r, notes)
            })
            .collect();
        Ok(self.rehydrator.rehydrate_all(refs).await)
    }
}

#[async_trait]
impl TweetSearcher for ApifyClient {
    async fn search(&self, query: &str, max_tweets: u32) -> Result<Vec<Value>> {
        self.search_tweets(query, max_tweets)
            .await
            .map_err(|e| HarvestError::Fetch(format!("apify search for '{query}': {e}")))
    }
}
