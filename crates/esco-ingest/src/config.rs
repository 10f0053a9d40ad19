//! Extraction configuration
//!
//! Defaults target the public ESCO API. Every value can be overridden through
//! `ESCO_*` environment variables (a `.env` file is honoured) and then through
//! the builder or CLI flags.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{IngestError, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Base URL of the ESCO REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://ec.europa.eu/esco/api";

/// Page listing the published ESCO dataset versions.
pub const DEFAULT_VERSION_PAGE_URL: &str = "https://esco.ec.europa.eu/en/classification/skill_main";

/// CSS selector of the block holding the version strings.
pub const DEFAULT_VERSION_MARKER: &str = "div.block-wrapper--esco_version";

/// Root of the skills pillar.
pub const DEFAULT_ROOT_URI: &str = "http://data.europa.eu/esco/skill/S";

/// Path of the concept resource, used for nodes and bulk details.
pub const DEFAULT_NODE_PATH: &str = "resource/concept";

/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_USER_AGENT: &str = concat!("esco-ingest/", env!("CARGO_PKG_VERSION"));

/// Records buffered between the crawler and the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on URIs per bulk request accepted by the API.
pub const MAX_BATCH_SIZE: usize = 50;

/// Ancestor levels carried by an output record (0, 1 and 2).
pub const MAX_ANCESTOR_LEVELS: usize = 3;

/// Worklist depth after which a branch is abandoned.
pub const DEFAULT_MAX_DEPTH: usize = 16;

pub const DEFAULT_DESCRIPTION_LOCALE: &str = "en-us";
pub const DEFAULT_LABEL_LOCALE: &str = "en";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
pub const DEFAULT_SOCKET_STEP_MS: u64 = 60_000;
pub const DEFAULT_SOCKET_CEILING_MS: u64 = 1_200_000;

/// How skill details are retrieved for a batch of leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// One `?uris=` request per batch, per-URI fallback on failure
    #[default]
    Bulk,
    /// One `?uri=` request per skill
    Sequential,
}

/// Where a record's ancestor columns come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AncestorSource {
    /// The concept path walked by the crawler
    #[default]
    Traversal,
    /// The detail's `_embedded.ancestors`, falling back to the walked path
    Embedded,
}

/// Retry and backoff settings for every HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts for connect/timeout failures and 5xx/429 responses
    pub max_attempts: u32,

    /// First exponential delay; doubles per attempt
    pub base_delay_ms: u64,

    pub max_delay_ms: u64,

    /// Added to the socket-error sleep on every occurrence
    pub socket_step_ms: u64,

    /// Socket-error sleep above which the fetch is abandoned
    pub socket_ceiling_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            socket_step_ms: DEFAULT_SOCKET_STEP_MS,
            socket_ceiling_ms: DEFAULT_SOCKET_CEILING_MS,
        }
    }
}

impl RetryConfig {
    /// Exponential delay before retry number `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    pub fn socket_step(&self) -> Duration {
        Duration::from_millis(self.socket_step_ms)
    }

    pub fn socket_ceiling(&self) -> Duration {
        Duration::from_millis(self.socket_ceiling_ms)
    }

    /// Millisecond delays for tests against local mock servers
    pub fn fast() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 1,
            max_delay_ms: 5,
            socket_step_ms: 1,
            socket_ceiling_ms: 5,
        }
    }
}

/// Traversal and record-shaping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Skill URIs per bulk request (1..=50)
    pub batch_size: usize,

    /// Ancestor levels copied into records (1..=3)
    pub max_ancestor_depth: usize,

    pub max_depth: usize,

    pub description_locale: String,

    pub label_locale: String,

    pub fetch_mode: FetchMode,

    pub ancestor_source: AncestorSource,

    /// Resource used for concept nodes and bulk detail requests
    pub node_path: String,

    /// Resource used for single-skill requests (`resource/skill` also works)
    pub detail_path: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            max_ancestor_depth: MAX_ANCESTOR_LEVELS,
            max_depth: DEFAULT_MAX_DEPTH,
            description_locale: DEFAULT_DESCRIPTION_LOCALE.to_string(),
            label_locale: DEFAULT_LABEL_LOCALE.to_string(),
            fetch_mode: FetchMode::Bulk,
            ancestor_source: AncestorSource::Traversal,
            node_path: DEFAULT_NODE_PATH.to_string(),
            detail_path: DEFAULT_NODE_PATH.to_string(),
        }
    }
}

/// Full configuration of an extraction session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscoConfig {
    pub api_base_url: String,

    pub version_page_url: String,

    /// CSS selector narrowing the version search; `None` scans the whole page
    pub version_marker: Option<String>,

    pub root_uri: String,

    pub timeout_secs: u64,

    pub user_agent: String,

    pub channel_capacity: usize,

    pub retry: RetryConfig,

    pub crawl: CrawlConfig,
}

impl Default for EscoConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            version_page_url: DEFAULT_VERSION_PAGE_URL.to_string(),
            version_marker: Some(DEFAULT_VERSION_MARKER.to_string()),
            root_uri: DEFAULT_ROOT_URI.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            retry: RetryConfig::default(),
            crawl: CrawlConfig::default(),
        }
    }
}

fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_enum<T: clap::ValueEnum>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => <T as clap::ValueEnum>::from_str(raw.trim(), true)
            .map(Some)
            .map_err(|e| IngestError::Config(format!("{}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

impl EscoConfig {
    /// Load configuration from environment and defaults
    ///
    /// Recognised variables: `ESCO_API_BASE_URL`, `ESCO_VERSION_PAGE_URL`,
    /// `ESCO_VERSION_MARKER` (empty disables the marker), `ESCO_ROOT_URI`,
    /// `ESCO_TIMEOUT_SECS`, `ESCO_USER_AGENT`, `ESCO_CHANNEL_CAPACITY`,
    /// `ESCO_BATCH_SIZE`, `ESCO_MAX_ANCESTOR_DEPTH`, `ESCO_MAX_DEPTH`,
    /// `ESCO_DESCRIPTION_LOCALE`, `ESCO_LABEL_LOCALE`, `ESCO_FETCH_MODE`,
    /// `ESCO_ANCESTOR_SOURCE`, `ESCO_DETAIL_PATH`, `ESCO_MAX_ATTEMPTS`,
    /// `ESCO_BASE_DELAY_MS`, `ESCO_SOCKET_STEP_MS`, `ESCO_SOCKET_CEILING_MS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let crawl_defaults = CrawlConfig::default();
        let retry_defaults = RetryConfig::default();

        let config = EscoConfig {
            api_base_url: std::env::var("ESCO_API_BASE_URL").unwrap_or(defaults.api_base_url),
            version_page_url: std::env::var("ESCO_VERSION_PAGE_URL")
                .unwrap_or(defaults.version_page_url),
            version_marker: match std::env::var("ESCO_VERSION_MARKER") {
                Ok(marker) if marker.trim().is_empty() => None,
                Ok(marker) => Some(marker),
                Err(_) => defaults.version_marker,
            },
            root_uri: std::env::var("ESCO_ROOT_URI").unwrap_or(defaults.root_uri),
            timeout_secs: env_var("ESCO_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            user_agent: std::env::var("ESCO_USER_AGENT").unwrap_or(defaults.user_agent),
            channel_capacity: env_var("ESCO_CHANNEL_CAPACITY").unwrap_or(defaults.channel_capacity),
            retry: RetryConfig {
                max_attempts: env_var("ESCO_MAX_ATTEMPTS").unwrap_or(retry_defaults.max_attempts),
                base_delay_ms: env_var("ESCO_BASE_DELAY_MS").unwrap_or(retry_defaults.base_delay_ms),
                max_delay_ms: retry_defaults.max_delay_ms,
                socket_step_ms: env_var("ESCO_SOCKET_STEP_MS")
                    .unwrap_or(retry_defaults.socket_step_ms),
                socket_ceiling_ms: env_var("ESCO_SOCKET_CEILING_MS")
                    .unwrap_or(retry_defaults.socket_ceiling_ms),
            },
            crawl: CrawlConfig {
                batch_size: env_var("ESCO_BATCH_SIZE").unwrap_or(crawl_defaults.batch_size),
                max_ancestor_depth: env_var("ESCO_MAX_ANCESTOR_DEPTH")
                    .unwrap_or(crawl_defaults.max_ancestor_depth),
                max_depth: env_var("ESCO_MAX_DEPTH").unwrap_or(crawl_defaults.max_depth),
                description_locale: std::env::var("ESCO_DESCRIPTION_LOCALE")
                    .unwrap_or(crawl_defaults.description_locale),
                label_locale: std::env::var("ESCO_LABEL_LOCALE")
                    .unwrap_or(crawl_defaults.label_locale),
                fetch_mode: env_enum("ESCO_FETCH_MODE")?.unwrap_or(crawl_defaults.fetch_mode),
                ancestor_source: env_enum("ESCO_ANCESTOR_SOURCE")?
                    .unwrap_or(crawl_defaults.ancestor_source),
                node_path: crawl_defaults.node_path,
                detail_path: std::env::var("ESCO_DETAIL_PATH")
                    .unwrap_or(crawl_defaults.detail_path),
            },
        };

        config.validate()?;

        Ok(config)
    }

    pub fn builder() -> EscoConfigBuilder {
        EscoConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_base_url)
            .map_err(|e| IngestError::Config(format!("api_base_url '{}': {}", self.api_base_url, e)))?;

        url::Url::parse(&self.version_page_url).map_err(|e| {
            IngestError::Config(format!("version_page_url '{}': {}", self.version_page_url, e))
        })?;

        if self.root_uri.trim().is_empty() {
            return Err(IngestError::Config("root_uri cannot be empty".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(IngestError::Config("timeout_secs must be greater than 0".to_string()));
        }

        if self.channel_capacity == 0 {
            return Err(IngestError::Config(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(IngestError::Config("max_attempts must be at least 1".to_string()));
        }

        if self.retry.socket_step_ms == 0 {
            return Err(IngestError::Config(
                "socket_step_ms must be greater than 0".to_string(),
            ));
        }

        let crawl = &self.crawl;

        if crawl.batch_size == 0 || crawl.batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::Config(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, crawl.batch_size
            )));
        }

        if crawl.max_ancestor_depth == 0 || crawl.max_ancestor_depth > MAX_ANCESTOR_LEVELS {
            return Err(IngestError::Config(format!(
                "max_ancestor_depth must be between 1 and {}, got {}",
                MAX_ANCESTOR_LEVELS, crawl.max_ancestor_depth
            )));
        }

        if crawl.max_depth == 0 {
            return Err(IngestError::Config("max_depth must be greater than 0".to_string()));
        }

        if crawl.description_locale.is_empty() || crawl.label_locale.is_empty() {
            return Err(IngestError::Config("locales cannot be empty".to_string()));
        }

        if crawl.node_path.is_empty() || crawl.detail_path.is_empty() {
            return Err(IngestError::Config("resource paths cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Builder for EscoConfig
#[derive(Debug, Default)]
pub struct EscoConfigBuilder {
    config: EscoConfig,
}

impl EscoConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn version_page_url(mut self, url: impl Into<String>) -> Self {
        self.config.version_page_url = url.into();
        self
    }

    pub fn version_marker(mut self, marker: Option<String>) -> Self {
        self.config.version_marker = marker;
        self
    }

    pub fn root_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.root_uri = uri.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.crawl.batch_size = size;
        self
    }

    pub fn max_ancestor_depth(mut self, depth: usize) -> Self {
        self.config.crawl.max_ancestor_depth = depth;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.crawl.max_depth = depth;
        self
    }

    pub fn fetch_mode(mut self, mode: FetchMode) -> Self {
        self.config.crawl.fetch_mode = mode;
        self
    }

    pub fn ancestor_source(mut self, source: AncestorSource) -> Self {
        self.config.crawl.ancestor_source = source;
        self
    }

    pub fn detail_path(mut self, path: impl Into<String>) -> Self {
        self.config.crawl.detail_path = path.into();
        self
    }

    pub fn build(self) -> Result<EscoConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
