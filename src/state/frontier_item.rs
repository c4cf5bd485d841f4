use serde::{Deserialize, Serialize};

/// One unit of crawl work: a URL and the chain of pages that led to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierItem {
    /// The URL to classify and possibly fetch
    pub url: String,

    /// URLs followed from the seed to reach this one, oldest first
    #[serde(default)]
    pub parent_urls: Vec<String>,
}

impl FrontierItem {
    /// Creates an item with no parents (a seed or a retried URL)
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent_urls: Vec::new(),
        }
    }

    /// Creates the item for a link found on this item's page
    ///
    /// The child's parent chain is this item's chain plus this item's URL.
    pub fn child(&self, url: impl Into<String>) -> Self {
        let mut parent_urls = Vec::with_capacity(self.parent_urls.len() + 1);
        parent_urls.extend(self.parent_urls.iter().cloned());
        parent_urls.push(self.url.clone());
        Self {
            url: url.into(),
            parent_urls,
        }
    }
}
