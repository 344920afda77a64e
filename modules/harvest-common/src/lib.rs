pub mod config;
pub mod error;
pub mod layout;
pub mod types;

pub use config::{Config, SearchBackend};
pub use error::{HarvestError, Result};
pub use layout::DataLayout;
pub use types::*;
