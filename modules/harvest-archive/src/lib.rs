pub mod error;
pub mod memgator;
pub mod timemap;

pub use error::{ArchiveError, LookupError, Result};
pub use memgator::MemgatorLookup;
pub use timemap::{placeholder, HarvestSummary, TimemapHarvester, TimemapLookup};
