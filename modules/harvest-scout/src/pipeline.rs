//! End-to-end run: collect links until the quota is met, then harvest a
//! timemap for each.

use anyhow::{Context, Result};
use apify_client::ApifyClient;
use browserless_client::BrowserlessClient;
use harvest_archive::{HarvestSummary, MemgatorLookup, TimemapHarvester, TimemapLookup};
use harvest_common::{Config, DataLayout, SearchBackend};
use tracing::{info, warn};

use crate::checkpoint::Checkpoint;
use crate::collect::TweetCollector;
use crate::extract::{HttpResolver, LinkExtractor, LinkResolver};
use crate::link_set::LinkSet;
use crate::quota::{CollectOutcome, QuotaCollector, QuotaPolicy};
use crate::rehydrate::Rehydrator;
use crate::round::TweetRound;
use crate::search::{BrowserSearcher, TweetSearcher};
use crate::topics::TopicPool;

/// Tuning for the collection loop.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Tweets requested in the first round.
    pub initial_request: u32,
    pub topics_per_round: usize,
    pub max_per_search: u32,
    pub resolve_concurrency: usize,
    pub max_rounds: Option<u32>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            initial_request: 200,
            topics_per_round: 5,
            max_per_search: 100,
            resolve_concurrency: 5,
            max_rounds: None,
        }
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// Quota met and every link has a timemap file.
    Complete {
        links: usize,
        timemaps: HarvestSummary,
    },
    /// Topics ran out first. The checkpoint on disk lets a later run resume.
    Incomplete { collected: usize, target: usize },
}

/// The pipeline's collaborators, injectable for tests.
pub struct Collaborators<L> {
    pub searcher: Box<dyn TweetSearcher>,
    pub resolver: Box<dyn LinkResolver>,
    pub lookup: L,
    pub topics: TopicPool,
}

/// Build the production collaborators from config.
pub fn collaborators(config: &Config) -> Result<Collaborators<MemgatorLookup>> {
    let searcher: Box<dyn TweetSearcher> = match &config.search_backend {
        SearchBackend::Browserless { base_url, token } => {
            let browserless = BrowserlessClient::new(base_url, token.as_deref())
                .context("Failed to build Browserless client")?;
            let rehydrator = Rehydrator::new(&config.syndication_token)?;
            Box::new(BrowserSearcher::new(browserless, rehydrator))
        }
        SearchBackend::Apify { api_key } => Box::new(ApifyClient::new(api_key.clone())),
    };

    Ok(Collaborators {
        searcher,
        resolver: Box::new(HttpResolver::new()?),
        lookup: MemgatorLookup::new(&config.memgator_image),
        topics: TopicPool::from_config(config.topics.as_deref()),
    })
}

pub async fn run(config: &Config, total_links: usize) -> Result<PipelineOutcome> {
    let layout = DataLayout::new(&config.data_dir);
    run_with(layout, collaborators(config)?, &CollectorConfig::default(), total_links).await
}

pub async fn run_with<L: TimemapLookup>(
    layout: DataLayout,
    parts: Collaborators<L>,
    options: &CollectorConfig,
    total_links: usize,
) -> Result<PipelineOutcome> {
    std::fs::create_dir_all(layout.root())
        .with_context(|| format!("Failed to create data dir {}", layout.root().display()))?;

    let checkpoint_path = layout.checkpoint_file();
    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let links = LinkSet::open(&layout.link_file())?;
    info!(
        existing_links = links.len(),
        target = total_links,
        topics = parts.topics.len(),
        "Starting link harvest"
    );

    let collector = TweetCollector::new(parts.searcher, layout.clone())
        .with_max_per_search(options.max_per_search);
    let extractor = LinkExtractor::new(parts.resolver, layout.clone())
        .with_concurrency(options.resolve_concurrency);
    let round = TweetRound::new(collector, extractor, parts.topics, layout.clone())
        .with_topics_per_round(options.topics_per_round);

    let mut policy = QuotaPolicy::new(total_links, options.initial_request);
    policy.max_rounds = options.max_rounds;

    let mut quota = QuotaCollector::new(round, links, policy).with_checkpoint_path(&checkpoint_path);
    let outcome = quota.run(checkpoint).await?;
    let links = quota.into_store();

    match outcome {
        CollectOutcome::Done {
            collected,
            rounds,
            mut checkpoint,
        } => {
            checkpoint.save(&checkpoint_path)?;
            info!(collected, rounds, "Link quota met, collecting timemaps");

            let harvester = TimemapHarvester::new(parts.lookup, layout);
            let timemaps = harvester.save_all(links.links(), None).await?;
            Ok(PipelineOutcome::Complete {
                links: links.len(),
                timemaps,
            })
        }
        CollectOutcome::NeedsMore { mut checkpoint } => {
            checkpoint.save(&checkpoint_path)?;
            warn!(
                collected = checkpoint.collected,
                target = total_links,
                "Ran out of topics before the link quota; add topics and rerun to resume"
            );
            Ok(PipelineOutcome::Incomplete {
                collected: checkpoint.collected,
                target: total_links,
            })
        }
    }
}
