use std::path::{Path, PathBuf};

/// Where every flat file of a run lives under `DATA_DIR`.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub const BATCH_PREFIX: &'static str = "scraped_tweets";
    pub const PARTIAL_PREFIX: &'static str = "twitter_serp";
    pub const BATCH_SUFFIX: &'static str = ".json.gz";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding numbered batch files and in-flight partials.
    pub fn batch_dir(&self) -> PathBuf {
        self.root.join("scraped_tweets")
    }

    pub fn link_file(&self) -> PathBuf {
        self.root.join("tweet_links.txt")
    }

    pub fn checkpoint_file(&self) -> PathBuf {
        self.root.join("checkpoint.json")
    }

    pub fn timemap_dir(&self) -> PathBuf {
        self.root.join("timemaps")
    }

    /// `uri{index}.json`, 1-based to line up with the link file.
    pub fn timemap_file(&self, index: usize) -> PathBuf {
        self.timemap_dir().join(format!("uri{index}.json"))
    }

    /// `twitter_serp{topic}_{page}.json.gz`, both 1-based.
    pub fn partial_file(&self, topic: usize, page: usize) -> PathBuf {
        self.batch_dir().join(format!(
            "{}{}_{}{}",
            Self::PARTIAL_PREFIX,
            topic,
            page,
            Self::BATCH_SUFFIX
        ))
    }
}
