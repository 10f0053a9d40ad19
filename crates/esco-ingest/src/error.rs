//! Error types for ESCO ingestion
//!
//! Only [`IngestError::VersionDiscovery`], [`IngestError::FetchAbandoned`] and
//! [`IngestError::RootUnavailable`] end a session early. Per-skill and per-batch
//! HTTP failures are logged and skipped by the crawler and never surface here.

use esco_common::CommonError;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// No `vX.Y.Z` marker could be found on the version page
    #[error("Version discovery failed: {0}")]
    VersionDiscovery(String),

    /// Retry budget exhausted for a request
    #[error("Fetch abandoned for {url} after {attempts} attempt(s): {reason}")]
    FetchAbandoned {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// The root concept could not be fetched or parsed; nothing below it is reachable
    #[error("Root concept {uri} unavailable: {reason}")]
    RootUnavailable { uri: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Session operation called out of order
    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    /// The consumer dropped the record stream before the crawl finished
    #[error("Record stream was closed before the crawl finished")]
    OutputClosed,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("Crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

