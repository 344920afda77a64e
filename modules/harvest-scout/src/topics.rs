//! Search topics. Each topic is a source: once searched it is recorded in the
//! checkpoint and never picked again, which keeps rounds off the same results
//! and spreads load across queries.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::checkpoint::Checkpoint;

const DEFAULT_TOPICS: &[&str] = &[
    "Black Lives Matter",
    "MeToo",
    "climate strike",
    "Fridays for Future",
    "Extinction Rebellion",
    "March for Our Lives",
    "Women's March",
    "Occupy Wall Street",
    "Stop Asian Hate",
    "Dakota Access Pipeline",
    "Standing Rock",
    "Me Too movement",
    "Never Again",
    "Fight for 15",
    "Pride march",
    "Arab Spring",
    "Hong Kong protests",
    "Free Palestine",
    "Ukraine protest",
    "mutual aid",
    "tenant union",
    "labor strike",
    "farmers protest",
    "Mahsa Amini",
];

#[derive(Debug, Clone)]
pub struct TopicPool {
    topics: Vec<String>,
}

impl Default for TopicPool {
    fn default() -> Self {
        Self::new(DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect())
    }
}

impl TopicPool {
    pub fn new(topics: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let topics = topics
            .into_iter()
            .filter(|t| !t.trim().is_empty() && seen.insert(t.clone()))
            .collect();
        Self { topics }
    }

    /// The configured pool if any, otherwise the built-in one.
    pub fn from_config(topics: Option<&[String]>) -> Self {
        match topics {
            Some(topics) if !topics.is_empty() => Self::new(topics.to_vec()),
            _ => Self::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topics not yet consumed according to `checkpoint`.
    pub fn remaining(&self, checkpoint: &Checkpoint) -> usize {
        self.topics.iter().filter(|t| !checkpoint.is_consumed(t)).count()
    }

    /// Up to `n` random unconsumed topics. Empty once the pool is used up.
    pub fn pick<R: Rng + ?Sized>(&self, n: usize, checkpoint: &Checkpoint, rng: &mut R) -> Vec<String> {
        self.pick_excluding(n, checkpoint, &HashSet::new(), rng)
    }

    /// Like [`pick`](Self::pick), also passing over `skip`. Topics in `skip`
    /// are held back for this run only; the checkpoint does not record them.
    pub fn pick_excluding<R: Rng + ?Sized>(
        &self,
        n: usize,
        checkpoint: &Checkpoint,
        skip: &HashSet<String>,
        rng: &mut R,
    ) -> Vec<String> {
        let mut unused: Vec<&String> = self
            .topics
            .iter()
            .filter(|t| !checkpoint.is_consumed(t) && !skip.contains(*t))
            .collect();
        unused.shuffle(rng);
        unused.into_iter().take(n).cloned().collect()
    }
}
