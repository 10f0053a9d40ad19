//! Command line interface of the `esco-ingest` binary

use clap::{Args, Parser, Subcommand};
use esco_common::Version;
use std::path::PathBuf;
use tracing::info;

use crate::config::{AncestorSource, EscoConfig, FetchMode};
use crate::error::Result;
use crate::esco::{ExtractionSession, RetryingFetcher, SessionOutcome, VersionResolver};
use crate::output::{OutputFormat, RecordWriter};
use crate::state::ReplicationState;

/// ESCO skills taxonomy extractor
#[derive(Parser, Debug)]
#[command(name = "esco-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract every skill of the published taxonomy
    Extract(ExtractArgs),

    /// Print the currently published taxonomy version
    Version(ApiArgs),
}

/// Overrides applied on top of `ESCO_*` environment configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ApiArgs {
    /// ESCO API base URL
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Page listing published dataset versions
    #[arg(long)]
    pub version_page_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Replication state file; advanced only after a complete run
    #[arg(long, env = "ESCO_STATE_FILE")]
    pub state: Option<PathBuf>,

    /// Last synced version, overrides the state file
    #[arg(long)]
    pub last_version: Option<Version>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Jsonl)]
    pub format: OutputFormat,

    /// Output file, stdout when omitted
    #[arg(short, long, env = "ESCO_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Skill URIs per bulk request (1-50)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Ancestor levels copied into each record (1-3)
    #[arg(long)]
    pub max_ancestor_depth: Option<usize>,

    #[arg(long, value_enum)]
    pub fetch_mode: Option<FetchMode>,

    #[arg(long, value_enum)]
    pub ancestor_source: Option<AncestorSource>,
}

impl ApiArgs {
    /// Apply overrides to `config` and validate the result
    pub fn apply(&self, mut config: EscoConfig) -> Result<EscoConfig> {
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        if let Some(url) = &self.version_page_url {
            config.version_page_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ExtractArgs {
    pub fn apply(&self, mut config: EscoConfig) -> Result<EscoConfig> {
        if let Some(size) = self.batch_size {
            config.crawl.batch_size = size;
        }
        if let Some(depth) = self.max_ancestor_depth {
            config.crawl.max_ancestor_depth = depth;
        }
        if let Some(mode) = self.fetch_mode {
            config.crawl.fetch_mode = mode;
        }
        if let Some(source) = self.ancestor_source {
            config.crawl.ancestor_source = source;
        }

        self.api.apply(config)
    }
}

/// `esco-ingest extract`
pub async fn extract(args: &ExtractArgs) -> Result<()> {
    let config = args.apply(EscoConfig::from_env()?)?;

    let mut state = match &args.state {
        Some(path) => ReplicationState::load(path)?,
        None => ReplicationState::default(),
    };
    let last_synced = args.last_version.or_else(|| state.last_synced());

    let mut session = ExtractionSession::new(config, last_synced)?;

    let mut extraction = match session.start().await? {
        SessionOutcome::UpToDate(version) => {
            info!(version = %version, "Nothing to extract");
            return Ok(());
        },
        SessionOutcome::Extracting(extraction) => extraction,
    };

    let mut writer = match &args.output {
        Some(path) => RecordWriter::create(args.format, path)?,
        None => RecordWriter::stdout(args.format)?,
    };

    while let Some(record) = extraction.next_record().await {
        writer.write(&record)?;
    }
    let written = writer.finish()?;

    let summary = session.finish(extraction).await?;
    info!(
        version = %summary.selected_version,
        written,
        stats = ?summary.stats,
        "Extraction written"
    );

    if let Some(path) = &args.state {
        state.advance(&summary.selected_version);
        state.save(path)?;
        info!(path = %path.display(), version = %summary.selected_version, "State advanced");
    }

    Ok(())
}

/// `esco-ingest version`
pub async fn version(args: &ApiArgs) -> Result<Version> {
    let config = args.apply(EscoConfig::from_env()?)?;
    let fetcher = RetryingFetcher::new(&config)?;
    VersionResolver::new(&config, fetcher)?.resolve().await
}
