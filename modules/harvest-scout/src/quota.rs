//! Quota-driven collection: run fetch rounds until a distinct-item target is
//! met or the sources run dry.
//!
//! The loop is an explicit three-state machine. `Collecting` runs another
//! round; `Satisfied` is terminal success; `Exhausted` is terminal but
//! resumable: the caller gets the [`Checkpoint`] back and a later invocation
//! with fresh sources continues from it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use harvest_common::Result;
use tracing::{info, warn};

use crate::checkpoint::Checkpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Collecting,
    Satisfied,
    Exhausted,
}

/// What one fetch round produced.
#[derive(Debug)]
pub enum RoundYield<T> {
    Items(Vec<T>),
    /// No unconsumed source is left; nothing was fetched.
    Exhausted,
}

/// One round of upstream work. Implementations record what they consumed in
/// the checkpoint so the next round never asks for it again.
#[async_trait]
pub trait RoundFetcher: Send {
    type Item: Send;

    async fn fetch(
        &mut self,
        request: u32,
        checkpoint: &mut Checkpoint,
    ) -> Result<RoundYield<Self::Item>>;
}

/// Persistent, deduplicating state the rounds feed into.
pub trait QuotaStore {
    type Item;

    fn count(&self) -> usize;

    /// Merge `items`, returning how many were new.
    fn merge(&mut self, items: Vec<Self::Item>) -> Result<usize>;
}

#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    pub target: usize,
    /// Request size of the first round.
    pub initial_request: u32,
    /// Items requested per missing item (two tweets per missing link).
    pub yield_multiplier: u32,
    /// Later requests are rounded up to a multiple of this.
    pub granularity: u32,
    /// Rounds allowed in one invocation before giving up as exhausted.
    pub max_rounds: Option<u32>,
}

impl QuotaPolicy {
    pub fn new(target: usize, initial_request: u32) -> Self {
        Self {
            target,
            initial_request,
            yield_multiplier: 2,
            granularity: 5,
            max_rounds: None,
        }
    }

    /// Request size after a round left `collected` items: the shortfall times
    /// the multiplier, rounded up to the granularity.
    pub fn next_request(&self, collected: usize) -> u32 {
        let shortfall = self.target.saturating_sub(collected) as u64;
        let wanted = shortfall * u64::from(self.yield_multiplier.max(1));
        let step = u64::from(self.granularity.max(1));
        let rounded = wanted.div_ceil(step) * step;
        rounded.min(u64::from(u32::MAX)) as u32
    }
}

#[derive(Debug)]
pub enum CollectOutcome {
    Done {
        collected: usize,
        /// Rounds run in this invocation.
        rounds: u32,
        checkpoint: Checkpoint,
    },
    NeedsMore { checkpoint: Checkpoint },
}

pub struct QuotaCollector<F, S> {
    fetcher: F,
    store: S,
    policy: QuotaPolicy,
    state: CollectorState,
    checkpoint_path: Option<PathBuf>,
}

impl<F, S> QuotaCollector<F, S>
where
    F: RoundFetcher,
    S: QuotaStore<Item = F::Item>,
{
    pub fn new(fetcher: F, store: S, policy: QuotaPolicy) -> Self {
        Self {
            fetcher,
            store,
            policy,
            state: CollectorState::Collecting,
            checkpoint_path: None,
        }
    }

    /// Persist the checkpoint to `path` after every completed round, so a
    /// crash mid-run loses at most the round in flight.
    pub fn with_checkpoint_path(mut self, path: &Path) -> Self {
        self.checkpoint_path = Some(path.to_path_buf());
        self
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Drive rounds from `checkpoint` until the target is met or no source is
    /// left. Fetch and merge errors abort the run; everything else ends in
    /// `Done` or `NeedsMore`.
    pub async fn run(&mut self, mut checkpoint: Checkpoint) -> Result<CollectOutcome> {
        let mut request = self.policy.initial_request;
        let mut rounds = 0u32;
        self.state = CollectorState::Collecting;

        loop {
            let collected = self.store.count();
            checkpoint.collected = collected;

            if collected >= self.policy.target {
                self.state = CollectorState::Satisfied;
                info!(collected, target = self.policy.target, rounds, "Quota satisfied");
                return Ok(CollectOutcome::Done {
                    collected,
                    rounds,
                    checkpoint,
                });
            }

            if self.policy.max_rounds.is_some_and(|max| rounds >= max) {
                self.state = CollectorState::Exhausted;
                warn!(collected, target = self.policy.target, rounds, "Round limit reached before quota");
                return Ok(CollectOutcome::NeedsMore { checkpoint });
            }

            info!(round = checkpoint.rounds + 1, request, collected, target = self.policy.target, "Starting round");

            match self.fetcher.fetch(request, &mut checkpoint).await? {
                RoundYield::Exhausted => {
                    self.state = CollectorState::Exhausted;
                    warn!(
                        collected,
                        target = self.policy.target,
                        consumed_sources = checkpoint.consumed_sources.len(),
                        "Sources exhausted before quota"
                    );
                    return Ok(CollectOutcome::NeedsMore { checkpoint });
                }
                RoundYield::Items(items) => {
                    let fetched = items.len();
                    let added = self.store.merge(items)?;
                    rounds += 1;
                    checkpoint.rounds += 1;
                    checkpoint.collected = self.store.count();
                    request = self.policy.next_request(checkpoint.collected);
                    if let Some(path) = &self.checkpoint_path {
                        checkpoint.save(path)?;
                    }
                    info!(
                        fetched,
                        added,
                        total = self.store.count(),
                        next_request = request,
                        "Round complete"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MemoryStore(HashSet<String>);

    impl QuotaStore for MemoryStore {
        type Item = String;

        fn count(&self) -> usize {
            self.0.len()
        }

        fn merge(&mut self, items: Vec<String>) -> Result<usize> {
            Ok(items.into_iter().filter(|i| self.0.insert(i.clone())).count())
        }
    }

    /// Hands out `per_call` fresh items per round, forever.
    struct Endless {
        per_call: usize,
        next: usize,
        requests: Vec<u32>,
    }

    #[async_trait]
    impl RoundFetcher for Endless {
        type Item = String;

        async fn fetch(&mut self, request: u32, _: &mut Checkpoint) -> Result<RoundYield<String>> {
            self.requests.push(request);
            let items = (self.next..self.next + self.per_call)
                .map(|i| format!("https://example.com/{i}"))
                .collect();
            self.next += self.per_call;
            Ok(RoundYield::Items(items))
        }
    }

    /// Each named source yields a fixed list once; then it is exhausted.
    struct Sources(Vec<(&'static str, Vec<String>)>);

    #[async_trait]
    impl RoundFetcher for Sources {
        type Item = String;

        async fn fetch(&mut self, _: u32, checkpoint: &mut Checkpoint) -> Result<RoundYield<String>> {
            let Some(pos) = self.0.iter().position(|(name, _)| !checkpoint.is_consumed(name)) else {
                return Ok(RoundYield::Exhausted);
            };
            let (name, items) = self.0.remove(pos);
            checkpoint.consumed_sources.push(name.to_string());
            Ok(RoundYield::Items(items))
        }
    }

    fn links(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("https://example.com/{i}")).collect()
    }

    #[tokio::test]
    async fn ten_per_round_reaches_twenty_five_in_three_rounds() {
        let fetcher = Endless { per_call: 10, next: 0, requests: Vec::new() };
        let mut collector = QuotaCollector::new(fetcher, MemoryStore::default(), QuotaPolicy::new(25, 200));

        let outcome = collector.run(Checkpoint::default()).await.unwrap();

        match outcome {
            CollectOutcome::Done { collected, rounds, checkpoint } => {
                assert_eq!(collected, 30);
                assert_eq!(rounds, 3);
                assert_eq!(checkpoint.rounds, 3);
                assert_eq!(checkpoint.collected, 30);
            }
            other => panic!("expected Done, got {other:?}"),
        }
        assert_eq!(collector.state(), CollectorState::Satisfied);
        // 200 first, then (25-10)*2=30, then (25-20)*2=10.
        assert_eq!(collector.fetcher.requests, vec![200, 30, 10]);
    }

    #[tokio::test]
    async fn exhausted_sources_return_resumable_checkpoint() {
        let fetcher = Sources(vec![("first", links(0..10)), ("second", links(10..15))]);
        let mut collector = QuotaCollector::new(fetcher, MemoryStore::default(), QuotaPolicy::new(25, 200));

        let outcome = collector.run(Checkpoint::default()).await.unwrap();

        let checkpoint = match outcome {
            CollectOutcome::NeedsMore { checkpoint } => checkpoint,
            other => panic!("expected NeedsMore, got {other:?}"),
        };
        assert_eq!(collector.state(), CollectorState::Exhausted);
        assert_eq!(checkpoint.collected, 15);
        assert_eq!(checkpoint.rounds, 2);
        assert_eq!(checkpoint.consumed_sources, vec!["first", "second"]);

        // A later invocation with a fresh source picks up where this one stopped.
        let store = collector.into_store();
        let fetcher = Sources(vec![("first", links(0..10)), ("third", links(15..27))]);
        let mut resumed = QuotaCollector::new(fetcher, store, QuotaPolicy::new(25, 200));
        match resumed.run(checkpoint).await.unwrap() {
            CollectOutcome::Done { collected, rounds, checkpoint } => {
                assert_eq!(collected, 27);
                assert_eq!(rounds, 1);
                assert_eq!(checkpoint.rounds, 3);
                assert_eq!(checkpoint.consumed_sources, vec!["first", "second", "third"]);
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn already_satisfied_store_runs_no_rounds() {
        let mut store = MemoryStore::default();
        store.merge(links(0..5)).unwrap();
        let fetcher = Endless { per_call: 10, next: 100, requests: Vec::new() };
        let mut collector = QuotaCollector::new(fetcher, store, QuotaPolicy::new(5, 200));

        let outcome = collector.run(Checkpoint::default()).await.unwrap();
        assert!(matches!(outcome, CollectOutcome::Done { rounds: 0, collected: 5, .. }));
        assert!(collector.fetcher.requests.is_empty());
    }

    #[tokio::test]
    async fn duplicate_yields_do_not_count() {
        // Every round returns the same 4 links after the first.
        struct Repeating;

        #[async_trait]
        impl RoundFetcher for Repeating {
            type Item = String;

            async fn fetch(&mut self, _: u32, checkpoint: &mut Checkpoint) -> Result<RoundYield<String>> {
                if checkpoint.rounds >= 3 {
                    return Ok(RoundYield::Exhausted);
                }
                Ok(RoundYield::Items(links(0..4)))
            }
        }

        let mut collector = QuotaCollector::new(Repeating, MemoryStore::default(), QuotaPolicy::new(10, 50));
        let outcome = collector.run(Checkpoint::default()).await.unwrap();
        match outcome {
            CollectOutcome::NeedsMore { checkpoint } => {
                assert_eq!(checkpoint.collected, 4);
                assert_eq!(checkpoint.rounds, 3);
            }
            other => panic!("expected NeedsMore, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn round_limit_ends_as_exhausted() {
        let fetcher = Endless { per_call: 1, next: 0, requests: Vec::new() };
        let mut policy = QuotaPolicy::new(100, 10);
        policy.max_rounds = Some(2);
        let mut collector = QuotaCollector::new(fetcher, MemoryStore::default(), policy);

        let outcome = collector.run(Checkpoint::default()).await.unwrap();
        assert!(matches!(outcome, CollectOutcome::NeedsMore { ref checkpoint } if checkpoint.rounds == 2));
        assert_eq!(collector.state(), CollectorState::Exhausted);
    }

    #[tokio::test]
    async fn checkpoint_is_saved_after_each_round() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let fetcher = Sources(vec![("first", links(0..3)), ("second", links(3..5))]);
        let mut collector =
            QuotaCollector::new(fetcher, MemoryStore::default(), QuotaPolicy::new(10, 20)).with_checkpoint_path(&path);

        collector.run(Checkpoint::default()).await.unwrap();

        let saved = Checkpoint::load(&path).unwrap();
        assert_eq!(saved.rounds, 2);
        assert_eq!(saved.collected, 5);
        assert_eq!(saved.consumed_sources, vec!["first", "second"]);
    }

    #[test]
    fn next_request_rounds_up_to_granularity() {
        let policy = QuotaPolicy::new(50, 200);
        assert_eq!(policy.next_request(0), 100);
        assert_eq!(policy.next_request(47), 10); // 6 -> 10
        assert_eq!(policy.next_request(48), 5); // 4 -> 5
        assert_eq!(policy.next_request(50), 0);
        assert_eq!(policy.next_request(70), 0);

        let mut odd = QuotaPolicy::new(10, 1);
        odd.yield_multiplier = 3;
        odd.granularity = 4;
        assert_eq!(odd.next_request(3), 24); // 21 -> 24
    }
}
