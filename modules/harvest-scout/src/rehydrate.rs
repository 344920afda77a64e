//! Full tweet objects from bare ids, via the public syndication endpoint that
//! powers embedded tweets.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use harvest_common::{HarvestError, Result, TweetNotes, TweetRef};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

const SYNDICATION_URL: &str = "https://cdn.syndication.twimg.com/tweet-result";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0";

pub struct Rehydrator {
    client: reqwest::Client,
    base_url: String,
    token: String,
    concurrency: usize,
}

impl Rehydrator {
    pub fn new(token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(REFERER, HeaderValue::from_static("https://platform.twitter.com/"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://platform.twitter.com"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HarvestError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            base_url: SYNDICATION_URL.to_string(),
            token: token.to_string(),
            concurrency: 5,
        })
    }

    /// Point at another endpoint with the same query contract.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// One tweet object. `None` when the endpoint has nothing for the id
    /// (deleted, protected, or an empty body).
    pub async fn rehydrate(&self, id: &str) -> Result<Option<Value>> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("id", id), ("lang", "en"), ("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| HarvestError::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(id, %status, "Syndication endpoint returned error status");
            return Ok(None);
        }

        let tweet: Value = resp
            .json()
            .await
            .map_err(|e| HarvestError::Fetch(e.to_string()))?;
        Ok(usable(tweet))
    }

    /// Rehydrate every ref concurrently and attach its notes. Failed or empty
    /// lookups are dropped; order of the output is not the input order.
    pub async fn rehydrate_all(&self, refs: Vec<(TweetRef, TweetNotes)>) -> Vec<Value> {
        let total = refs.len();
        let results: Vec<Option<Value>> = stream::iter(refs.into_iter().map(|(tweet_ref, notes)| {
            async move {
                match self.rehydrate(&tweet_ref.id).await {
                    Ok(Some(tweet)) => Some(with_notes(tweet, &notes)),
                    Ok(None) => None,
                    Err(e) => {
                        warn!(id = tweet_ref.id.as_str(), error = %e, "Rehydration failed");
                        None
                    }
                }
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let tweets: Vec<Value> = results.into_iter().flatten().collect();
        info!(requested = total, rehydrated = tweets.len(), "Rehydrated tweets");
        tweets
    }
}

fn usable(tweet: Value) -> Option<Value> {
    match &tweet {
        Value::Object(map) if !map.is_empty() => Some(tweet),
        _ => None,
    }
}

fn with_notes(mut tweet: Value, notes: &TweetNotes) -> Value {
    if let (Value::Object(map), Ok(notes)) = (&mut tweet, serde_json::to_value(notes)) {
        map.insert("notes".to_string(), notes);
    }
    tweet
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notes_are_attached_under_notes_key() {
        let notes = TweetNotes {
            timeline_screen_name: "someone".to_string(),
            is_retweet: false,
        };
        let tweet = with_notes(json!({ "id_str": "1" }), &notes);
        assert_eq!(
            tweet["notes"],
            json!({ "timeline_screen_name": "someone", "is_retweet": false })
        );
        assert_eq!(tweet["id_str"], "1");
    }

    #[test]
    fn empty_or_non_object_bodies_are_unusable() {
        assert!(usable(json!({})).is_none());
        assert!(usable(json!(null)).is_none());
        assert!(usable(json!([1, 2])).is_none());
        assert!(usable(json!({ "id_str": "1" })).is_some());
    }

    #[tokio::test]
    async fn unreachable_endpoint_drops_every_ref() {
        let rehydrator = Rehydrator::new("token")
            .unwrap()
            .with_base_url("http://127.0.0.1:9/tweet-result");
        let refs = vec![(
            TweetRef {
                id: "1".to_string(),
                screen_name: "someone".to_string(),
            },
            TweetNotes::default(),
        )];
        assert!(rehydrator.rehydrate_all(refs).await.is_empty());
    }
}
