//! Extraction session: version gate, crawl and record stream
//!
//! ```text
//! Init -> VersionCheck -> Skip
//!                      -> Crawling -> Done
//! ```
//!
//! The crawl runs in its own task and hands records over a bounded channel,
//! so a slow consumer throttles the crawler instead of growing a buffer.

use std::pin::Pin;
use std::task::{Context, Poll};

use esco_common::Version;
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::config::EscoConfig;
use crate::error::{IngestError, Result};
use crate::esco::crawler::{CrawlStats, TreeCrawler};
use crate::esco::fetcher::RetryingFetcher;
use crate::esco::record::OutputRecord;
use crate::esco::version::VersionResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    VersionCheck,
    /// Published version equals the last synced one; nothing to emit
    Skip,
    Crawling,
    Done,
}

/// Result of [`ExtractionSession::start`]
#[derive(Debug)]
pub enum SessionOutcome {
    UpToDate(Version),
    Extracting(Extraction),
}

/// Lazy, one-pass stream of records from a running crawl
#[derive(Debug)]
pub struct Extraction {
    selected_version: Version,
    records: ReceiverStream<OutputRecord>,
    task: JoinHandle<Result<CrawlStats>>,
}

impl Extraction {
    /// Version stamped on every record; the new high-water mark
    pub fn selected_version(&self) -> &Version {
        &self.selected_version
    }

    pub async fn next_record(&mut self) -> Option<OutputRecord> {
        self.records.next().await
    }
}

impl Stream for Extraction {
    type Item = OutputRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().records).poll_next(cx)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub selected_version: Version,
    pub stats: CrawlStats,
}

pub struct ExtractionSession {
    config: EscoConfig,
    fetcher: RetryingFetcher,
    last_synced: Option<Version>,
    state: SessionState,
}

impl ExtractionSession {
    pub fn new(config: EscoConfig, last_synced: Option<Version>) -> Result<Self> {
        config.validate()?;
        let fetcher = RetryingFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, fetcher, last_synced))
    }

    /// Session over an already configured fetcher
    pub fn with_fetcher(
        config: EscoConfig,
        fetcher: RetryingFetcher,
        last_synced: Option<Version>,
    ) -> Self {
        Self {
            config,
            fetcher,
            last_synced,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Resolve the published version and start crawling unless it was already synced
    ///
    /// Must be called once, on a fresh session.
    pub async fn start(&mut self) -> Result<SessionOutcome> {
        if self.state != SessionState::Init {
            return Err(IngestError::InvalidTransition(format!(
                "start() called in state {:?}",
                self.state
            )));
        }

        self.state = SessionState::VersionCheck;

        let resolved = match VersionResolver::new(&self.config, self.fetcher.clone()) {
            Ok(resolver) => resolver.resolve().await,
            Err(e) => Err(e),
        };
        let version = match resolved {
            Ok(version) => version,
            Err(e) => {
                self.state = SessionState::Done;
                return Err(e);
            },
        };

        match self.last_synced {
            Some(last) if last == version => {
                info!(version = %version, "Already synced, skipping extraction");
                self.state = SessionState::Skip;
                return Ok(SessionOutcome::UpToDate(version));
            },
            Some(last) if last > version => {
                warn!(
                    last_synced = %last,
                    published = %version,
                    "Published version is older than the last synced one, extracting anyway"
                );
            },
            Some(last) => info!(last_synced = %last, published = %version, "New version published"),
            None => info!(published = %version, "No previous sync, running full extraction"),
        }

        let crawler = TreeCrawler::new(&self.config, self.fetcher.clone(), version);
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let task = tokio::spawn(async move { crawler.crawl(&tx).await });

        self.state = SessionState::Crawling;

        Ok(SessionOutcome::Extracting(Extraction {
            selected_version: version,
            records: ReceiverStream::new(rx),
            task,
        }))
    }

    /// Wait for the crawl to end and report its statistics
    ///
    /// Records left unread in `extraction` count as a closed output.
    pub async fn finish(&mut self, extraction: Extraction) -> Result<ExtractionSummary> {
        if self.state != SessionState::Crawling {
            return Err(IngestError::InvalidTransition(format!(
                "finish() called in state {:?}",
                self.state
            )));
        }

        let Extraction {
            selected_version,
            records,
            task,
        } = extraction;

        let mut receiver = records.into_inner();
        receiver.close();
        let unread = receiver.try_recv().is_ok();

        let outcome = task.await;
        self.state = SessionState::Done;

        let stats = outcome??;
        if unread {
            return Err(IngestError::OutputClosed);
        }

        info!(
            version = %selected_version,
            records = stats.records_emitted,
            skipped = stats.skipped,
            "Extraction complete"
        );

        Ok(ExtractionSummary {
            selected_version,
            stats,
        })
    }
}
