//! ESCO Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Extracts the skills pillar of the ESCO taxonomy as flat records.
//!
//! # Overview
//!
//! - **Version gate**: the published dataset version is scraped and compared
//!   with the last synced one; an unchanged taxonomy yields no records
//! - **Crawl**: depth-first walk from the root concept, batched bulk detail
//!   fetches with per-skill fallback
//! - **Records**: one [`OutputRecord`] per skill with its level 0-2 ancestors,
//!   streamed while the crawl runs
//! - **Host side**: replication state file, JSON lines / CSV writers and the
//!   `esco-ingest` binary
//!
//! # Example
//!
//! ```no_run
//! use esco_ingest::{EscoConfig, ExtractionSession, SessionOutcome};
//!
//! # async fn run() -> esco_ingest::Result<()> {
//! let mut session = ExtractionSession::new(EscoConfig::from_env()?, None)?;
//!
//! if let SessionOutcome::Extracting(mut extraction) = session.start().await? {
//!     while let Some(record) = extraction.next_record().await {
//!         println!("{} {}", record.uri, record.title);
//!     }
//!     let summary = session.finish(extraction).await?;
//!     println!("synced {}", summary.selected_version);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod esco;
pub mod output;
pub mod state;

// Re-export commonly used types
pub use config::{AncestorSource, CrawlConfig, EscoConfig, FetchMode, RetryConfig};
pub use error::{IngestError, Result};
pub use esco::{
    Extraction, ExtractionSession, ExtractionSummary, OutputRecord, SessionOutcome, SessionState,
};
pub use output::{OutputFormat, RecordWriter};
pub use state::ReplicationState;
