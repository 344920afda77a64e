pub mod checkpoint;
pub mod collect;
pub mod combine;
pub mod extract;
pub mod jsonl;
pub mod link_set;
pub mod pipeline;
pub mod quota;
pub mod rehydrate;
pub mod round;
pub mod search;
pub mod sequence;
pub mod topics;

pub use checkpoint::Checkpoint;
pub use combine::{combine_partials, CombineMode, CombineReport};
pub use link_set::LinkSet;
pub use quota::{CollectOutcome, CollectorState, QuotaCollector, QuotaPolicy, QuotaStore, RoundFetcher, RoundYield};
pub use sequence::{FilePattern, FileSequence};
