//! One collection round: search every topic, write each search to a partial
//! file, and fold the partials into the next numbered batch file.

use harvest_common::{DataLayout, HarvestError, Result};
use tracing::{info, warn};

use crate::combine::{combine_partials, CombineMode};
use crate::jsonl::write_jsonl_gz;
use crate::search::TweetSearcher;
use crate::sequence::{FilePattern, FileSequence};

/// How a round's tweet budget is split over topics and searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPlan {
    /// Searches run per topic.
    pub pages: u32,
    /// Tweets requested per search.
    pub page_size: u32,
}

impl SearchPlan {
    /// Even split of `total` across `topics`. A share that fits one search
    /// is fetched in one; a larger share becomes as many full searches as fit.
    pub fn new(total: u32, topics: usize, max_per_search: u32) -> Self {
        let max_per_search = max_per_search.max(1);
        let per_topic = (total / topics.max(1) as u32).max(1);
        if per_topic <= max_per_search {
            Self {
                pages: 1,
                page_size: per_topic,
            }
        } else {
            Self {
                pages: per_topic / max_per_search,
                page_size: max_per_search,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedBatch {
    pub number: u32,
    pub tweets: usize,
    /// Topics with at least one search that answered, even if with nothing.
    pub searched: Vec<String>,
    /// Topics whose every search errored. Nothing is known about them yet.
    pub failed: Vec<String>,
}

pub struct TweetCollector {
    searcher: Box<dyn TweetSearcher>,
    layout: DataLayout,
    max_per_search: u32,
}

impl TweetCollector {
    pub fn new(searcher: Box<dyn TweetSearcher>, layout: DataLayout) -> Self {
        Self {
            searcher,
            layout,
            max_per_search: 100,
        }
    }

    pub fn with_max_per_search(mut self, max_per_search: u32) -> Self {
        self.max_per_search = max_per_search.max(1);
        self
    }

    /// Collect about `total` tweets across `topics` into a new batch file.
    ///
    /// Each topic is combined as soon as its searches finish, so an error
    /// later in the round leaves the earlier topics in the batch.
    pub async fn collect(&self, topics: &[String], total: u32) -> Result<CollectedBatch> {
        let dir = self.layout.batch_dir();
        std::fs::create_dir_all(&dir).map_err(HarvestError::io(&dir))?;

        let batches = FileSequence::scan(
            &dir,
            FilePattern::new(DataLayout::BATCH_PREFIX, DataLayout::BATCH_SUFFIX),
        )?;
        let number = batches.next();
        let dest = batches.path_for(number);

        let plan = SearchPlan::new(total, topics.len(), self.max_per_search);
        info!(batch = number, topics = topics.len(), total, ?plan, "Collecting tweets");

        let mut batch = CollectedBatch {
            number,
            tweets: 0,
            searched: Vec::new(),
            failed: Vec::new(),
        };

        for (i, topic) in topics.iter().enumerate() {
            let topic_index = i + 1;
            let mut answered = false;

            for page in 1..=plan.pages as usize {
                let tweets = match self.searcher.search(topic, plan.page_size).await {
                    Ok(tweets) => {
                        answered = true;
                        tweets
                    }
                    Err(e) => {
                        warn!(topic = topic.as_str(), page, error = %e, "Search failed, skipping");
                        continue;
                    }
                };
                if tweets.is_empty() {
                    continue;
                }
                let partial = self.layout.partial_file(topic_index, page);
                write_jsonl_gz(&partial, &tweets)?;
            }

            if answered {
                batch.searched.push(topic.clone());
            } else {
                batch.failed.push(topic.clone());
            }

            let mode = if i == 0 {
                CombineMode::Create
            } else {
                CombineMode::Append
            };
            let pattern = FilePattern::new(
                &format!("{}{}_", DataLayout::PARTIAL_PREFIX, topic_index),
                DataLayout::BATCH_SUFFIX,
            );
            let report = combine_partials(&dir, &pattern, &dest, mode)?;
            batch.tweets += report.lines;
            info!(topic = topic.as_str(), tweets = report.lines, "Topic collected");
        }

        info!(batch = number, tweets = batch.tweets, "Batch file written");
        Ok(batch)
    }
}
