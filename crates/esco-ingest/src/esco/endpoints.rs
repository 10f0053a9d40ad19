//! ESCO API endpoint URL builders

use url::Url;

use crate::config::CrawlConfig;
use crate::error::Result;

/// Builds request URLs against one API base
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
    node_path: String,
    detail_path: String,
}

impl Endpoints {
    pub fn new(base_url: &str, crawl: &CrawlConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            node_path: crawl.node_path.trim_matches('/').to_string(),
            detail_path: crawl.detail_path.trim_matches('/').to_string(),
        }
    }

    /// Concept node: `{base}/{node_path}?uri={uri}`
    pub fn node_url(&self, uri: &str) -> Result<Url> {
        self.resource_url(&self.node_path, "uri", uri)
    }

    /// Bulk detail: `{base}/{node_path}?uris={u1},{u2},...`
    pub fn bulk_url(&self, uris: &[String]) -> Result<Url> {
        self.resource_url(&self.node_path, "uris", &uris.join(","))
    }

    /// Single skill detail: `{base}/{detail_path}?uri={uri}`
    pub fn detail_url(&self, uri: &str) -> Result<Url> {
        self.resource_url(&self.detail_path, "uri", uri)
    }

    fn resource_url(&self, path: &str, key: &str, value: &str) -> Result<Url> {
        let url = Url::parse_with_params(&format!("{}/{}", self.base_url, path), &[(key, value)])?;
        Ok(url)
    }
}
