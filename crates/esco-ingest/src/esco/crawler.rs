//! Depth-first walk of the skills pillar
//!
//! Concept nodes are expanded through an explicit worklist of
//! `(uri, context, depth)` entries. Skill leaves are batched per
//! `narrowerSkill` list and their details fetched in bulk, falling back to one
//! request per skill when a bulk call fails. Records are pushed into a bounded
//! channel as soon as they are built.

use std::collections::{HashMap, HashSet};

use esco_common::Version;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{AncestorSource, CrawlConfig, EscoConfig, FetchMode};
use crate::error::{IngestError, Result};
use crate::esco::batch::BatchAccumulator;
use crate::esco::context::{level_of, AncestorContext};
use crate::esco::endpoints::Endpoints;
use crate::esco::fetcher::RetryingFetcher;
use crate::esco::models::{BulkResponse, ConceptNode, Link, NodeKind, SkillDetail};
use crate::esco::record::{OutputRecord, RecordBuilder};

/// Counters for one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub concepts_visited: u64,
    pub skill_links: u64,
    pub records_emitted: u64,
    pub bulk_requests: u64,
    pub bulk_fallbacks: u64,
    pub single_requests: u64,
    /// Nodes, batches entries or skills dropped after a failed or unusable response
    pub skipped: u64,
    pub repeated_nodes: u64,
    pub too_deep: u64,
}

#[derive(Debug)]
struct WorkItem {
    uri: String,
    context: AncestorContext,
    depth: usize,
}

/// Walks the taxonomy from the root and emits one record per skill leaf
#[derive(Debug, Clone)]
pub struct TreeCrawler {
    fetcher: RetryingFetcher,
    endpoints: Endpoints,
    crawl: CrawlConfig,
    root_uri: String,
    builder: RecordBuilder,
    version: Version,
}

impl TreeCrawler {
    pub fn new(config: &EscoConfig, fetcher: RetryingFetcher, version: Version) -> Self {
        Self {
            fetcher,
            endpoints: Endpoints::new(&config.api_base_url, &config.crawl),
            crawl: config.crawl.clone(),
            root_uri: config.root_uri.clone(),
            builder: RecordBuilder::new(&config.crawl),
            version,
        }
    }

    /// Crawl the whole tree, sending records to `tx`
    ///
    /// Fails with [`IngestError::OutputClosed`] when the receiver goes away,
    /// with [`IngestError::FetchAbandoned`] when a request runs out of retries
    /// and with [`IngestError::RootUnavailable`] when the root cannot be read.
    pub async fn crawl(&self, tx: &mpsc::Sender<OutputRecord>) -> Result<CrawlStats> {
        info!(
            root = %self.root_uri,
            version = %self.version,
            batch_size = self.crawl.batch_size,
            fetch_mode = ?self.crawl.fetch_mode,
            "Starting taxonomy crawl"
        );

        let mut stats = CrawlStats::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut worklist = vec![WorkItem {
            uri: self.root_uri.clone(),
            context: AncestorContext::new(),
            depth: 0,
        }];

        while let Some(item) = worklist.pop() {
            if item.depth > self.crawl.max_depth {
                warn!(uri = %item.uri, depth = item.depth, "Branch exceeds max depth, skipping");
                stats.too_deep += 1;
                continue;
            }

            if !visited.insert(item.uri.clone()) {
                warn!(uri = %item.uri, "Concept already visited, skipping");
                stats.repeated_nodes += 1;
                continue;
            }

            let is_root = item.depth == 0;
            let Some(node) = self.fetch_node(&item.uri, is_root, &mut stats).await? else {
                continue;
            };
            stats.concepts_visited += 1;

            match node.kind() {
                NodeKind::Concept(children) => {
                    debug!(uri = %item.uri, children = children.len(), "Expanding concept");

                    for child in children.iter().rev() {
                        if child.uri.is_empty() {
                            stats.skipped += 1;
                            continue;
                        }

                        let title = child.title.as_deref().unwrap_or_default();
                        worklist.push(WorkItem {
                            uri: child.uri.clone(),
                            context: item.context.descend(level_of(&child.uri), &child.uri, title),
                            depth: item.depth + 1,
                        });
                    }
                },
                NodeKind::SkillParent(skills) => {
                    debug!(uri = %item.uri, skills = skills.len(), "Collecting skills");
                    self.process_skills(skills, &item.context, tx, &mut stats).await?;
                },
                NodeKind::Terminal => {
                    debug!(uri = %item.uri, "Concept has no narrower entries");
                },
            }
        }

        info!(
            concepts = stats.concepts_visited,
            records = stats.records_emitted,
            bulk_requests = stats.bulk_requests,
            bulk_fallbacks = stats.bulk_fallbacks,
            single_requests = stats.single_requests,
            skipped = stats.skipped,
            "Taxonomy crawl finished"
        );

        Ok(stats)
    }

    /// A failed branch is skipped; a failed root ends the crawl
    async fn fetch_node(
        &self,
        uri: &str,
        is_root: bool,
        stats: &mut CrawlStats,
    ) -> Result<Option<ConceptNode>> {
        let url = self.endpoints.node_url(uri)?;
        let response = self.fetcher.get(&url).await?;

        if !response.is_success() {
            if is_root {
                return Err(root_unavailable(uri, format!("HTTP {}", response.status)));
            }
            warn!(uri = %uri, status = %response.status, "Concept fetch failed, skipping branch");
            stats.skipped += 1;
            return Ok(None);
        }

        match response.json::<ConceptNode>() {
            Ok(node) => Ok(Some(node)),
            Err(e) if is_root => Err(root_unavailable(uri, format!("unparsable body: {}", e))),
            Err(e) => {
                warn!(uri = %uri, error = %e, "Unparsable concept, skipping branch");
                stats.skipped += 1;
                Ok(None)
            },
        }
    }

    async fn process_skills(
        &self,
        skills: &[Link],
        context: &AncestorContext,
        tx: &mpsc::Sender<OutputRecord>,
        stats: &mut CrawlStats,
    ) -> Result<()> {
        let mut batches = BatchAccumulator::new(self.crawl.batch_size);

        for skill in skills {
            if skill.uri.is_empty() {
                stats.skipped += 1;
                continue;
            }
            stats.skill_links += 1;

            if let Some(batch) = batches.add(skill.uri.clone()) {
                self.fetch_batch(&batch, context, tx, stats).await?;
            }
        }

        if let Some(batch) = batches.flush_remaining() {
            self.fetch_batch(&batch, context, tx, stats).await?;
        }

        Ok(())
    }

    async fn fetch_batch(
        &self,
        batch: &[String],
        context: &AncestorContext,
        tx: &mpsc::Sender<OutputRecord>,
        stats: &mut CrawlStats,
    ) -> Result<()> {
        if self.crawl.fetch_mode == FetchMode::Sequential {
            for uri in batch {
                self.fetch_single(uri, context, tx, stats).await?;
            }
            return Ok(());
        }

        match self.fetch_bulk(batch, stats).await? {
            Some(mut details) => {
                for uri in batch {
                    match details.remove(uri) {
                        Some(detail) => self.emit(uri, detail, context, tx, stats).await?,
                        None => {
                            debug!(uri = %uri, "Skill missing from bulk response, fetching alone");
                            self.fetch_single(uri, context, tx, stats).await?;
                        },
                    }
                }
            },
            None => {
                stats.bulk_fallbacks += 1;
                for uri in batch {
                    self.fetch_single(uri, context, tx, stats).await?;
                }
            },
        }

        Ok(())
    }

    /// Details keyed by URI, `None` when the caller should fall back
    async fn fetch_bulk(
        &self,
        batch: &[String],
        stats: &mut CrawlStats,
    ) -> Result<Option<HashMap<String, SkillDetail>>> {
        let url = self.endpoints.bulk_url(batch)?;
        stats.bulk_requests += 1;

        let response = self.fetcher.get(&url).await?;

        if !response.is_success() {
            warn!(
                size = batch.len(),
                status = %response.status,
                "Bulk detail fetch failed, falling back to single requests"
            );
            return Ok(None);
        }

        match response.json::<BulkResponse>() {
            Ok(bulk) => Ok(Some(bulk.embedded)),
            Err(e) => {
                warn!(
                    size = batch.len(),
                    error = %e,
                    "Unparsable bulk response, falling back to single requests"
                );
                Ok(None)
            },
        }
    }

    async fn fetch_single(
        &self,
        uri: &str,
        context: &AncestorContext,
        tx: &mpsc::Sender<OutputRecord>,
        stats: &mut CrawlStats,
    ) -> Result<()> {
        let url = self.endpoints.detail_url(uri)?;
        stats.single_requests += 1;

        let response = self.fetcher.get(&url).await?;

        if !response.is_success() {
            warn!(uri = %uri, status = %response.status, "Skill fetch failed, skipping");
            stats.skipped += 1;
            return Ok(());
        }

        match response.json::<SkillDetail>() {
            Ok(detail) => self.emit(uri, detail, context, tx, stats).await,
            Err(e) => {
                warn!(uri = %uri, error = %e, "Unparsable skill, skipping");
                stats.skipped += 1;
                Ok(())
            },
        }
    }

    async fn emit(
        &self,
        uri: &str,
        mut detail: SkillDetail,
        context: &AncestorContext,
        tx: &mpsc::Sender<OutputRecord>,
        stats: &mut CrawlStats,
    ) -> Result<()> {
        if detail.uri.is_empty() {
            detail.uri = uri.to_string();
        }

        let embedded = self.embedded_context(&detail);
        let record = self
            .builder
            .build(&detail, embedded.as_ref().unwrap_or(context), &self.version);

        tx.send(record).await.map_err(|_| IngestError::OutputClosed)?;
        stats.records_emitted += 1;

        Ok(())
    }

    /// Context from `_embedded.ancestors` when configured and non-empty
    fn embedded_context(&self, detail: &SkillDetail) -> Option<AncestorContext> {
        if self.crawl.ancestor_source != AncestorSource::Embedded {
            return None;
        }

        let context = AncestorContext::from_embedded(detail.ancestors(), &self.root_uri, &detail.uri);
        (!context.is_empty()).then_some(context)
    }
}

fn root_unavailable(uri: &str, reason: String) -> IngestError {
    error!(uri = %uri, reason = %reason, "Root concept unavailable, aborting crawl");
    IngestError::RootUnavailable {
        uri: uri.to_string(),
        reason,
    }
}
