//! Resume marker for the collector, persisted as JSON next to the data.

use std::path::Path;

use chrono::{DateTime, Utc};
use harvest_common::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How much source data earlier rounds have consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// First batch file number whose links have not been extracted yet.
    pub next_batch: u32,
    /// Sources (search topics) already requested. Never requested again.
    #[serde(default)]
    pub consumed_sources: Vec<String>,
    /// Rounds run across every invocation.
    #[serde(default)]
    pub rounds: u32,
    /// Satisfied count when the checkpoint was taken.
    #[serde(default)]
    pub collected: usize,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            next_batch: 1,
            consumed_sources: Vec::new(),
            rounds: 0,
            collected: 0,
            updated_at: None,
        }
    }
}

impl Checkpoint {
    pub fn is_consumed(&self, source: &str) -> bool {
        self.consumed_sources.iter().any(|s| s == source)
    }

    /// Load the checkpoint at `path`, or a fresh one if there is none.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(HarvestError::io(path)(e)),
        };
        let checkpoint: Checkpoint = serde_json::from_slice(&raw)?;
        info!(
            path = %path.display(),
            next_batch = checkpoint.next_batch,
            rounds = checkpoint.rounds,
            consumed_sources = checkpoint.consumed_sources.len(),
            "Loaded checkpoint"
        );
        Ok(checkpoint)
    }

    /// Write through a temporary file and rename, so a crash mid-write leaves
    /// the previous checkpoint intact.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Some(Utc::now());
        let encoded = serde_json::to_vec_pretty(self)?;

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, encoded).map_err(HarvestError::io(&tmp_path))?;
        std::fs::rename(&tmp_path, path).map_err(HarvestError::io(path))?;

        info!(path = %path.display(), rounds = self.rounds, "Checkpoint saved");
        Ok(())
    }
}
