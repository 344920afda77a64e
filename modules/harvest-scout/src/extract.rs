//! Link extraction from batch files.
//!
//! Each tweet contributes at most its first outbound link. The link is
//! resolved through redirects (shorteners, trackers) and kept only if the
//! final URL is outside the blocked hosts.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use harvest_common::{DataLayout, Result, TweetRecord};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::jsonl::read_lines_gz;
use crate::sequence::{FilePattern, FileSequence};

/// Hosts whose links are not harvested: social platforms and media hosts
/// whose pages are not archived the way ordinary web pages are. Matched as
/// substrings of the resolved URL.
pub const BLOCKED_HOSTS: &[&str] = &[
    "twitter.com",
    "youtube.com",
    "twitch.com",
    "twitch.tv",
    "soundcloud.com",
    "/x.com",
    "tiktok.com",
];

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn is_allowed_link(url: &str) -> bool {
    !BLOCKED_HOSTS.iter().any(|host| url.contains(host))
}

/// Follows a link to where it finally lands.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// The final URL, or `None` when the link is dead or unreachable.
    async fn resolve(&self, url: &str) -> Option<String>;
}

/// Resolves with a GET that follows redirects; only a 200 counts.
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(RESOLVE_TIMEOUT)
            .build()
            .map_err(|e| harvest_common::HarvestError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkResolver for HttpResolver {
    async fn resolve(&self, url: &str) -> Option<String> {
        match self.client.get(url).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => Some(resp.url().to_string()),
            Ok(resp) => {
                debug!(url, status = %resp.status(), "Link did not resolve to 200");
                None
            }
            Err(e) => {
                debug!(url, error = %e, "Link resolution failed");
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Extraction {
    /// Resolved, allowed links, sorted and distinct.
    pub links: Vec<String>,
    /// First batch number not read by this extraction.
    pub next_batch: u32,
    pub files_read: usize,
    pub tweets_read: usize,
}

pub struct LinkExtractor {
    resolver: Box<dyn LinkResolver>,
    layout: DataLayout,
    concurrency: usize,
}

impl LinkExtractor {
    pub fn new(resolver: Box<dyn LinkResolver>, layout: DataLayout) -> Self {
        Self {
            resolver,
            layout,
            concurrency: 5,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Extract links from every batch file numbered `from_batch` or higher.
    pub async fn extract(&self, from_batch: u32) -> Result<Extraction> {
        let dir = self.layout.batch_dir();
        let seq = FileSequence::scan(
            &dir,
            FilePattern::new(DataLayout::BATCH_PREFIX, DataLayout::BATCH_SUFFIX),
        )?;

        let mut extraction = Extraction {
            next_batch: seq.next().max(from_batch),
            ..Default::default()
        };

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        for &number in seq.existing().iter().filter(|n| **n >= from_batch) {
            let path = seq.path_for(number);
            let lines = read_lines_gz(&path)?;
            extraction.files_read += 1;

            for line in lines.iter().filter(|l| !l.trim().is_empty()) {
                let tweet: TweetRecord = match serde_json::from_str(line) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(batch = number, error = %e, "Skipping malformed tweet line");
                        continue;
                    }
                };
                extraction.tweets_read += 1;
                if let Some(link) = tweet.first_link() {
                    if seen.insert(link.to_string()) {
                        candidates.push(link.to_string());
                    }
                }
            }
        }

        info!(
            files = extraction.files_read,
            tweets = extraction.tweets_read,
            candidates = candidates.len(),
            "Resolving tweet links"
        );

        let resolver = &self.resolver;
        let resolved: Vec<Option<String>> = stream::iter(candidates.into_iter().map(|url| {
            async move { resolver.resolve(&url).await }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let mut links: Vec<String> = resolved
            .into_iter()
            .flatten()
            .filter(|url| is_allowed_link(url))
            .collect();
        links.sort();
        links.dedup();

        info!(links = links.len(), next_batch = extraction.next_batch, "Link extraction complete");
        extraction.links = links;
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonl::write_jsonl_gz;
    use serde_json::json;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl LinkResolver for MapResolver {
        async fn resolve(&self, url: &str) -> Option<String> {
            self.0.get(url).map(|s| s.to_string())
        }
    }

    fn tweet(id: &str, urls: &[&str]) -> serde_json::Value {
        let urls: Vec<_> = urls.iter().map(|u| json!({ "expanded_url": u })).collect();
        json!({ "id_str": id, "entities": { "urls": urls } })
    }

    #[test]
    fn blocked_hosts_are_rejected() {
        assert!(!is_allowed_link("https://www.youtube.com/watch?v=1"));
        assert!(!is_allowed_link("https://x.com/someone/status/1"));
        assert!(!is_allowed_link("https://twitch.tv/stream"));
        assert!(is_allowed_link("https://news.example.org/story"));
        // Only the host form is blocked, not any domain ending in x.com.
        assert!(is_allowed_link("https://box.com/file"));
    }

    #[tokio::test]
    async fn extracts_resolved_allowed_first_links() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        std::fs::create_dir_all(layout.batch_dir()).unwrap();

        write_jsonl_gz(
            &layout.batch_dir().join("scraped_tweets1.json.gz"),
            &[
                tweet("1", &["https://t.co/a", "https://t.co/ignored"]),
                tweet("2", &["https://t.co/yt"]),
                tweet("3", &[]),
            ],
        )
        .unwrap();
        write_jsonl_gz(
            &layout.batch_dir().join("scraped_tweets2.json.gz"),
            &[tweet("4", &["https://t.co/b"]), tweet("5", &["https://t.co/a"]), tweet("6", &["https://t.co/dead"])],
        )
        .unwrap();

        let resolver = MapResolver(HashMap::from([
            ("https://t.co/a", "https://news.example.org/a"),
            ("https://t.co/b", "https://blog.example.net/b"),
            ("https://t.co/yt", "https://www.youtube.com/watch?v=1"),
            ("https://t.co/ignored", "https://ignored.example/"),
        ]));
        let extractor = LinkExtractor::new(Box::new(resolver), layout);

        let extraction = extractor.extract(1).await.unwrap();
        assert_eq!(
            extraction.links,
            vec!["https://blog.example.net/b", "https://news.example.org/a"]
        );
        assert_eq!(extraction.files_read, 2);
        assert_eq!(extraction.tweets_read, 6);
        assert_eq!(extraction.next_batch, 3);
    }

    #[tokio::test]
    async fn earlier_batches_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        std::fs::create_dir_all(layout.batch_dir()).unwrap();
        write_jsonl_gz(&layout.batch_dir().join("scraped_tweets1.json.gz"), &[tweet("1", &["https://t.co/a"])]).unwrap();
        write_jsonl_gz(&layout.batch_dir().join("scraped_tweets2.json.gz"), &[tweet("2", &["https://t.co/b"])]).unwrap();

        let resolver = MapResolver(HashMap::from([
            ("https://t.co/a", "https://a.example/"),
            ("https://t.co/b", "https://b.example/"),
        ]));
        let extraction = LinkExtractor::new(Box::new(resolver), layout).extract(2).await.unwrap();
        assert_eq!(extraction.links, vec!["https://b.example/"]);
        assert_eq!(extraction.files_read, 1);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        std::fs::create_dir_all(layout.batch_dir()).unwrap();

        let path = layout.batch_dir().join("scraped_tweets1.json.gz");
        write_jsonl_gz(&path, &[json!("not a tweet"), tweet("1", &["https://t.co/a"])]).unwrap();

        let resolver = MapResolver(HashMap::from([("https://t.co/a", "https://a.example/")]));
        let extraction = LinkExtractor::new(Box::new(resolver), layout).extract(1).await.unwrap();
        assert_eq!(extraction.links, vec!["https://a.example/"]);
        assert_eq!(extraction.tweets_read, 1);
    }

    #[tokio::test]
    async fn no_batches_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = LinkExtractor::new(Box::new(MapResolver(HashMap::new())), DataLayout::new(dir.path()));
        let extraction = extractor.extract(4).await.unwrap();
        assert!(extraction.links.is_empty());
        assert_eq!(extraction.next_batch, 4);
    }
}
