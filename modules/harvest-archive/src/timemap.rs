// Timemap harvest: one `uri{i}.json` per line of the link file.

use async_trait::async_trait;
use harvest_common::{DataLayout, HarvestError};
use tracing::{info, warn};

use crate::error::{LookupError, Result};
use crate::memgator::extract_json;

/// Archive-lookup collaborator: one URI in, the raw tool output back.
#[async_trait]
pub trait TimemapLookup: Send + Sync {
    async fn lookup(&self, uri: &str) -> std::result::Result<String, LookupError>;
}

/// Stand-in document for a URI whose lookup produced no JSON. Written for
/// timeouts and failed runs too, so file `i` always belongs to link `i`.
pub fn placeholder(uri: &str) -> String {
    serde_json::json!({ "original_uri": uri }).to_string()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Files written with a real timemap.
    pub written: usize,
    /// Files written with the placeholder document.
    pub placeholders: usize,
    /// Links before the start line, left untouched.
    pub skipped: usize,
}

pub struct TimemapHarvester<L> {
    lookup: L,
    layout: DataLayout,
}

impl<L: TimemapLookup> TimemapHarvester<L> {
    pub fn new(lookup: L, layout: DataLayout) -> Self {
        Self { lookup, layout }
    }

    /// First 1-based index in `1..=total` without a timemap file, or `None`
    /// when every link already has one.
    pub fn first_missing(&self, total: usize) -> Option<usize> {
        (1..=total).find(|i| !self.layout.timemap_file(*i).exists())
    }

    /// Look up every link from `start_line` (1-based) onward and write its
    /// timemap. With no start line the harvest resumes at the first missing file.
    pub async fn save_all(&self, links: &[String], start_line: Option<usize>) -> Result<HarvestSummary> {
        let start = match start_line {
            Some(line) => line.max(1),
            None => match self.first_missing(links.len()) {
                Some(line) => line,
                None => {
                    info!(total = links.len(), "All timemaps already collected");
                    return Ok(HarvestSummary {
                        skipped: links.len(),
                        ..Default::default()
                    });
                }
            },
        };

        let dir = self.layout.timemap_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(HarvestError::io(&dir))?;

        let mut summary = HarvestSummary {
            skipped: (start - 1).min(links.len()),
            ..Default::default()
        };

        for (offset, uri) in links.iter().enumerate().skip(start - 1) {
            let index = offset + 1;
            info!(index, total = links.len(), uri = uri.as_str(), "Collecting timemap");

            let document = match self.lookup.lookup(uri).await {
                Ok(output) => extract_json(&output).map(str::to_string),
                Err(e) => {
                    warn!(index, uri = uri.as_str(), error = %e, "Timemap lookup failed");
                    None
                }
            };

            let body = match document {
                Some(json) => {
                    summary.written += 1;
                    json
                }
                None => {
                    summary.placeholders += 1;
                    placeholder(uri)
                }
            };

            let path = self.layout.timemap_file(index);
            tokio::fs::write(&path, body)
                .await
                .map_err(HarvestError::io(&path))?;
        }

        info!(
            written = summary.written,
            placeholders = summary.placeholders,
            skipped = summary.skipped,
            "Timemap harvest complete"
        );
        Ok(summary)
    }
}
