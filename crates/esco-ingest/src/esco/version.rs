//! ESCO dataset version discovery
//!
//! The published version is scraped from the classification landing page,
//! which lists every release as `ESCO dataset - vX.Y.Z`. The highest one wins.

use esco_common::Version;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::config::EscoConfig;
use crate::error::{IngestError, Result};
use crate::esco::fetcher::RetryingFetcher;

/// Resolves the currently published taxonomy version
#[derive(Debug, Clone)]
pub struct VersionResolver {
    fetcher: RetryingFetcher,
    page_url: Url,
    marker: Option<Selector>,
}

impl VersionResolver {
    pub fn new(config: &EscoConfig, fetcher: RetryingFetcher) -> Result<Self> {
        let page_url = Url::parse(&config.version_page_url)?;
        let marker = config
            .version_marker
            .as_deref()
            .map(parse_marker)
            .transpose()?;

        Ok(Self {
            fetcher,
            page_url,
            marker,
        })
    }

    pub async fn resolve(&self) -> Result<Version> {
        info!(url = %self.page_url, "Resolving published ESCO version");

        let response = self.fetcher.get(&self.page_url).await?;

        if !response.is_success() {
            return Err(IngestError::VersionDiscovery(format!(
                "version page {} returned {}",
                self.page_url, response.status
            )));
        }

        let version = extract_version(&response.body, self.marker.as_ref())?;
        info!(version = %version, "Resolved published version");

        Ok(version)
    }
}

fn parse_marker(marker: &str) -> Result<Selector> {
    Selector::parse(marker)
        .map_err(|e| IngestError::Config(format!("version_marker '{}': {:?}", marker, e)))
}

/// Highest `vX.Y.Z` on the page
///
/// Text inside elements matching `marker` is searched first; when the marker
/// is missing or holds no version the raw document is scanned for
/// `ESCO dataset - vX.Y.Z` release labels only.
pub fn extract_version(html: &str, marker: Option<&Selector>) -> Result<Version> {
    if let Some(selector) = marker {
        let document = Html::parse_document(html);
        let marked_text: String = document
            .select(selector)
            .flat_map(|element| element.text())
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(version) = Version::find_all(&marked_text).into_iter().max() {
            return Ok(version);
        }

        debug!("No version inside the marker, scanning the whole page");
    }

    Version::find_dataset_releases(html)
        .into_iter()
        .max()
        .ok_or_else(|| {
            IngestError::VersionDiscovery("no 'ESCO dataset - vX.Y.Z' label found on page".to_string())
        })
}
