//! The tweet-to-link round the quota collector drives.

use std::collections::HashSet;

use async_trait::async_trait;
use harvest_common::{DataLayout, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::checkpoint::Checkpoint;
use crate::collect::TweetCollector;
use crate::extract::LinkExtractor;
use crate::quota::{RoundFetcher, RoundYield};
use crate::sequence::{FilePattern, FileSequence};
use crate::topics::TopicPool;

pub struct TweetRound {
    collector: TweetCollector,
    extractor: LinkExtractor,
    topics: TopicPool,
    layout: DataLayout,
    topics_per_round: usize,
    rng: StdRng,
    /// Topics whose searches all errored during this run. Left out of the
    /// checkpoint so a later run tries them again.
    failed: HashSet<String>,
}

impl TweetRound {
    pub fn new(
        collector: TweetCollector,
        extractor: LinkExtractor,
        topics: TopicPool,
        layout: DataLayout,
    ) -> Self {
        Self {
            collector,
            extractor,
            topics,
            layout,
            topics_per_round: 5,
            rng: StdRng::from_os_rng(),
            failed: HashSet::new(),
        }
    }

    pub fn with_topics_per_round(mut self, n: usize) -> Self {
        self.topics_per_round = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn next_batch_on_disk(&self) -> Result<u32> {
        let seq = FileSequence::scan(
            &self.layout.batch_dir(),
            FilePattern::new(DataLayout::BATCH_PREFIX, DataLayout::BATCH_SUFFIX),
        )?;
        Ok(seq.next())
    }
}

#[async_trait]
impl RoundFetcher for TweetRound {
    type Item = String;

    /// Batches already on disk past the cursor (left by an interrupted run)
    /// are extracted before anything new is searched.
    async fn fetch(&mut self, request: u32, checkpoint: &mut Checkpoint) -> Result<RoundYield<String>> {
        if checkpoint.next_batch < self.next_batch_on_disk()? {
            info!(from_batch = checkpoint.next_batch, "Extracting batches left by an earlier run");
            let extraction = self.extractor.extract(checkpoint.next_batch).await?;
            checkpoint.next_batch = extraction.next_batch;
            return Ok(RoundYield::Items(extraction.links));
        }

        let topics = self
            .topics
            .pick_excluding(self.topics_per_round, checkpoint, &self.failed, &mut self.rng);
        if topics.is_empty() {
            if !self.failed.is_empty() {
                warn!(failed = ?self.failed, "Only topics with failed searches remain; they are retried next run");
            }
            return Ok(RoundYield::Exhausted);
        }
        info!(topics = ?topics, request, "Searching new topics");

        let batch = self.collector.collect(&topics, request).await?;
        checkpoint.consumed_sources.extend(batch.searched);
        self.failed.extend(batch.failed);
        let extraction = self.extractor.extract(batch.number).await?;
        checkpoint.next_batch = extraction.next_batch;
        Ok(RoundYield::Items(extraction.links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::LinkResolver;
    use crate::search::TweetSearcher;
    use harvest_common::HarvestError;
    use serde_json::{json, Value};

    /// Errors for every query in `down`, one linked tweet otherwise.
    struct PartialOutage {
        down: Vec<&'static str>,
    }

    #[async_trait]
    impl TweetSearcher for PartialOutage {
        async fn search(&self, query: &str, _max_tweets: u32) -> Result<Vec<Value>> {
            if self.down.iter().any(|d| *d == query) {
                return Err(HarvestError::Fetch("503".to_string()));
            }
            Ok(vec![json!({
                "id_str": "1",
                "entities": { "urls": [{ "expanded_url": format!("https://{query}.example/") }] }
            })])
        }
    }

    struct Identity;

    #[async_trait]
    impl LinkResolver for Identity {
        async fn resolve(&self, url: &str) -> Option<String> {
            Some(url.to_string())
        }
    }

    fn round(layout: &DataLayout, down: Vec<&'static str>, names: &[&str]) -> TweetRound {
        let pool = TopicPool::new(names.iter().map(|s| s.to_string()).collect());
        TweetRound::new(
            TweetCollector::new(Box::new(PartialOutage { down }), layout.clone()),
            LinkExtractor::new(Box::new(Identity), layout.clone()),
            pool,
            layout.clone(),
        )
        .with_topics_per_round(1)
        .with_seed(42)
    }

    #[tokio::test]
    async fn failed_topics_are_not_consumed_and_not_repeated_in_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let mut round = round(&layout, vec!["beta"], &["alpha", "beta"]);
        let mut checkpoint = Checkpoint::default();

        let mut links = Vec::new();
        let mut rounds = 0;
        loop {
            match round.fetch(10, &mut checkpoint).await.unwrap() {
                RoundYield::Items(items) => links.extend(items),
                RoundYield::Exhausted => break,
            }
            rounds += 1;
            assert!(rounds <= 2, "a failed topic must not be picked twice in one run");
        }

        assert_eq!(links, vec!["https://alpha.example/"]);
        assert_eq!(checkpoint.consumed_sources, vec!["alpha"]);
        assert_eq!(checkpoint.next_batch, 3);
    }

    #[tokio::test]
    async fn seeded_rounds_pick_the_same_topics() {
        let mut orders = Vec::new();
        for _ in 0..2 {
            let dir = tempfile::tempdir().unwrap();
            let layout = DataLayout::new(dir.path());
            let mut round = round(&layout, vec![], &["a", "b", "c", "d", "e"]);
            let mut checkpoint = Checkpoint::default();
            while let RoundYield::Items(_) = round.fetch(5, &mut checkpoint).await.unwrap() {}
            orders.push(checkpoint.consumed_sources);
        }
        assert_eq!(orders[0].len(), 5);
        assert_eq!(orders[0], orders[1]);
    }
}
