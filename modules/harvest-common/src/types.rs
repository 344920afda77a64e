use serde::{Deserialize, Serialize};

/// The slice of a tweet record the link extractor reads. Batch files keep the
/// full upstream JSON; everything else is ignored on the way in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetRecord {
    pub id_str: Option<String>,
    #[serde(default)]
    pub entities: TweetEntities,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetEntities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlEntity {
    pub expanded_url: Option<String>,
}

impl TweetRecord {
    /// The first outbound link of the tweet. Later links are not followed.
    pub fn first_link(&self) -> Option<&str> {
        self.entities
            .urls
            .first()
            .and_then(|u| u.expanded_url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Provenance attached to every rehydrated tweet under the `notes` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetNotes {
    pub timeline_screen_name: String,
    pub is_retweet: bool,
}

/// A bare tweet id scraped from a results page, before rehydration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TweetRef {
    pub id: String,
    pub screen_name: String,
}
