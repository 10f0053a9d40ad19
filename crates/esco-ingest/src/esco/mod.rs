// ESCO Skills Taxonomy Extraction
//
// Walks the skills pillar of the ESCO classification
// (https://esco.ec.europa.eu/) and flattens every skill into a fixed-schema
// record annotated with its level 0-2 ancestors.
//
// Pipeline:
// - Version: scrape the published dataset version, gate incremental runs
// - Crawl: depth-first walk of narrowerConcept links down to narrowerSkill leaves
// - Fetch: bulk detail requests of up to 50 skills, per-skill fallback
// - Build: detail JSON + ancestor context -> OutputRecord
//
// API:
// - Node:   {base}/resource/concept?uri={uri}
// - Bulk:   {base}/resource/concept?uris={uri1},{uri2},...
// - Detail: {base}/resource/skill?uri={uri}

pub mod batch;
pub mod context;
pub mod crawler;
pub mod endpoints;
pub mod fetcher;
pub mod models;
pub mod record;
pub mod session;
pub mod version;

// Re-export main types
pub use batch::BatchAccumulator;
pub use context::{level_of, Ancestor, AncestorContext};
pub use crawler::{CrawlStats, TreeCrawler};
pub use endpoints::Endpoints;
pub use fetcher::{classify_error, FailureKind, FetchedResponse, RetryingFetcher, StatusClass};
pub use models::{ConceptNode, Link, NodeKind, SkillDetail};
pub use record::{OutputRecord, RecordBuilder, LABEL_SEPARATOR};
pub use session::{Extraction, ExtractionSession, ExtractionSummary, SessionOutcome, SessionState};
pub use version::{extract_version, VersionResolver};
