//! Hybrid listing search.
//!
//! Dense + BM25 retrieval with convex score fusion, an optional rerank gate,
//! infrastructure-proximity filters over enriched listings, and a ranking
//! evaluation harness. The `lsearch` binary is a thin shell over [`run`].

pub mod config;
pub mod evaluation;
pub mod model;
pub mod search;
pub mod sources;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Subscriber;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AppConfig, ConfigError};
use crate::evaluation::{EvaluationError, EvaluationSettings, format_report};
use crate::model::{FilterOperator, FilterSet, InfrastructureFilter, Listing, ScoredListing};
use crate::search::SearchError;
use crate::search::rerank_gate::{GateMode, RerankCandidate};
use crate::search::session::SearchSession;
use crate::sources::DatasetError;

const LOG_FILE_PREFIX: &str = "lsearch.log";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lsearch",
    version,
    about = "Hybrid dense + BM25 listing search with infrastructure filters"
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write a daily rolling debug log into this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run hybrid search (and the rerank gate) over a listing snapshot
    Search {
        /// Listing snapshot JSON; raw upstream listings when --enrichment is set
        #[arg(long, value_name = "JSON")]
        snapshot: PathBuf,

        /// Free-text query
        #[arg(long, short = 'Q')]
        query: String,

        /// Enrichment JSON (`[{id, original_text, places}]`)
        #[arg(long, value_name = "JSON")]
        enrichment: Option<PathBuf>,

        /// Infrastructure filter `category` or `category=name` (repeatable)
        #[arg(long = "filter", value_name = "CATEGORY[=NAME]")]
        filters: Vec<InfrastructureFilter>,

        /// How filters combine
        #[arg(long, default_value = "and", value_name = "and|or")]
        operator: FilterOperator,

        /// Results to return after the rerank gate
        #[arg(long, default_value_t = 5)]
        top_k: usize,

        /// Fused candidates passed to the rerank gate (defaults to config)
        #[arg(long)]
        candidates: Option<usize>,

        /// Skip the rerank provider; keep fusion order
        #[arg(long)]
        no_rerank: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Score rankings against a labeled dataset
    Eval {
        /// Evaluation dataset JSON
        #[arg(long, value_name = "JSON")]
        dataset: PathBuf,

        /// Run the full pipeline over this snapshot instead of scoring stored rankings
        #[arg(long, value_name = "JSON")]
        snapshot: Option<PathBuf>,

        /// Metric cutoff; in pipeline mode this is also the rerank top-k
        #[arg(long)]
        k: Option<usize>,

        /// Pipeline retrieval depth (defaults to config)
        #[arg(long)]
        top_k_retrieval: Option<usize>,

        /// Skip the rerank provider in pipeline mode
        #[arg(long)]
        no_rerank: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print the normalised form of a text
    Normalize {
        text: String,
    },
}

impl Commands {
    pub fn wants_json(&self) -> bool {
        match self {
            Commands::Search { json, .. } | Commands::Eval { json, .. } => *json,
            Commands::Normalize { .. } => false,
        }
    }
}

/// Error surfaced to the process boundary.
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    pub code: i32,
    pub kind: &'static str,
    pub message: String,
    pub hint: Option<String>,
    pub retryable: bool,
}

impl CliError {
    fn usage(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            code: 2,
            kind: "usage",
            message: message.into(),
            hint: hint.map(str::to_string),
            retryable: false,
        }
    }

    fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let (code, kind, hint, retryable) = if err.downcast_ref::<ConfigError>().is_some() {
            (3, "config", Some("Check the config file and LSEARCH_* variables"), false)
        } else if err.downcast_ref::<DatasetError>().is_some() {
            (4, "dataset", Some("Check that the JSON file exists and is well formed"), false)
        } else if let Some(search) = err.downcast_ref::<SearchError>() {
            let hint = match search {
                SearchError::DuplicateId(_) => Some("Listing ids must be unique within a snapshot"),
                SearchError::InvalidK(_) => Some("Use a value of at least 1"),
                SearchError::DimensionMismatch { .. } => {
                    Some("The embedding dimension in config must match the provider")
                }
            };
            (5, "search", hint, false)
        } else if err.downcast_ref::<EvaluationError>().is_some() {
            (5, "evaluation", None, false)
        } else {
            (1, "runtime", None, true)
        };
        Self {
            code,
            kind,
            message,
            hint: hint.map(str::to_string),
            retryable,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self })
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CliError {}

/// Parse arguments. Help and version requests print and exit here.
pub fn parse_cli<I, T>(args: I) -> Result<Cli, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| {
        use clap::error::ErrorKind;
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => CliError::usage(err.to_string().trim_end(), Some("Run `lsearch --help`")),
        }
    })
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("loading configuration")
    .map_err(|err| CliError::from_anyhow(&err))?;

    let log_dir = cli.log_dir.clone().or_else(|| config.logging.log_dir.clone());
    let _guard = init_tracing(cli.verbose, cli.quiet, log_dir.as_deref())
        .map_err(|err| CliError::from_anyhow(&err))?;

    dispatch(&cli.command, &config).map_err(|err| CliError::from_anyhow(&err))
}

/// File output records every target at debug, independent of `RUST_LOG`
/// and the verbosity flags.
fn file_log_layer<S>(writer: NonBlocking) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG)
}

/// Install stderr logging plus an optional daily rolling file. Keep the
/// returned guard alive until exit so buffered lines are flushed.
pub fn init_tracing(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn,listing_search=info",
        (false, 1) => "info,listing_search=debug",
        (false, _) => "debug,listing_search=trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(file_log_layer(writer)), Some(guard))
        }
        None => (None, None),
    };

    // A subscriber may already be installed (tests); that is fine.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(guard)
}

fn dispatch(command: &Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Search {
            snapshot,
            query,
            enrichment,
            filters,
            operator,
            top_k,
            candidates,
            no_rerank,
            json,
        } => {
            let filters = FilterSet::new(filters.clone(), *operator);
            let listings = load_listings(snapshot, enrichment.as_deref(), &filters)?;
            let depth = candidates.unwrap_or(config.evaluation.top_k_retrieval);
            run_search(config, listings, query, *top_k, depth, !no_rerank, *json)
        }
        Commands::Eval {
            dataset,
            snapshot,
            k,
            top_k_retrieval,
            no_rerank,
            json,
        } => run_eval(
            config,
            dataset,
            snapshot.as_deref(),
            *k,
            *top_k_retrieval,
            !no_rerank,
            *json,
        ),
        Commands::Normalize { text } => {
            println!("{}", search::canonicalize::canonicalize(text));
            Ok(())
        }
    }
}

fn load_listings(
    snapshot: &Path,
    enrichment: Option<&Path>,
    filters: &FilterSet,
) -> Result<Vec<Listing>> {
    let Some(enrichment) = enrichment else {
        if filters.is_active() {
            bail!(ConfigError::Validation(
                "--filter needs --enrichment (places come from the enrichment file)".into()
            ));
        }
        return Ok(sources::load_snapshot(snapshot)?);
    };

    let raw = sources::load_raw_listings(snapshot)?;
    let enrichments = sources::load_enrichments(enrichment)?;
    let assembled = sources::assemble_listings(&raw, &enrichments, filters);
    if assembled.dropped > 0 {
        info!(
            dropped = assembled.dropped,
            kept = assembled.listings.len(),
            filters = filters.filters.len(),
            operator = %filters.operator,
            "Listings excluded by infrastructure filters"
        );
    }
    Ok(assembled.listings)
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    mode: GateMode,
    results: Vec<SearchResultRow<'a>>,
}

#[derive(Serialize)]
struct SearchResultRow<'a> {
    id: i64,
    score: f32,
    title: &'a str,
    price: i64,
    address: &'a str,
}

fn run_search(
    config: &AppConfig,
    listings: Vec<Listing>,
    query: &str,
    top_k: usize,
    depth: usize,
    rerank: bool,
    json: bool,
) -> Result<()> {
    if top_k == 0 {
        bail!(SearchError::InvalidK(top_k));
    }
    let embedder = config.build_embedder().context("building embedder")?;
    let gate = config
        .build_rerank_gate(rerank)
        .context("building rerank gate")?;

    let session = SearchSession::build_with_batch_size(
        listings,
        embedder,
        config.fusion,
        config.embedding.batch_size,
    )?;
    let fused = session.search(query, depth.max(top_k))?;
    debug!(candidates = fused.len(), "Fused candidates ready");

    let candidates: Vec<RerankCandidate<'_>> = fused
        .iter()
        .filter_map(|hit| {
            session.listing(hit.id).map(|listing| RerankCandidate {
                hit: *hit,
                text: &listing.full_text_content,
            })
        })
        .collect();
    let output = gate.apply(query, &candidates, top_k)?;
    if output.mode == GateMode::Fallback {
        warn!("Rerank provider unavailable; results are in fusion order");
    }

    let rows: Vec<SearchResultRow<'_>> = output
        .results
        .iter()
        .filter_map(|hit: &ScoredListing| {
            session.listing(hit.id).map(|listing| SearchResultRow {
                id: listing.id,
                score: hit.score,
                title: &listing.title,
                price: listing.price,
                address: &listing.address,
            })
        })
        .collect();

    if json {
        let payload = SearchOutput {
            query,
            mode: output.mode,
            results: rows,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{}", "No results.".yellow());
        return Ok(());
    }
    for (rank, row) in rows.iter().enumerate() {
        println!(
            "{:>2}. {} {}  {}",
            rank + 1,
            format!("[{}]", row.id).cyan(),
            format!("{:.4}", row.score).green(),
            row.title.bold()
        );
        if !row.address.is_empty() || row.price > 0 {
            println!("    {} | {}", row.address.dimmed(), format_price(row.price).dimmed());
        }
    }
    Ok(())
}

fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if price < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

fn run_eval(
    config: &AppConfig,
    dataset: &Path,
    snapshot: Option<&Path>,
    k: Option<usize>,
    top_k_retrieval: Option<usize>,
    rerank: bool,
    json: bool,
) -> Result<()> {
    let cases = evaluation::load_eval_dataset(dataset);

    let report = match snapshot {
        None => {
            let k = k.unwrap_or(config.evaluation.top_k_rerank);
            evaluation::evaluate_dataset(&cases, k)?
        }
        Some(snapshot) => {
            let settings = EvaluationSettings {
                top_k_retrieval: top_k_retrieval.unwrap_or(config.evaluation.top_k_retrieval),
                top_k_rerank: k.unwrap_or(config.evaluation.top_k_rerank),
                rerank_threshold: config.evaluation.rerank_threshold,
            };
            let listings = sources::load_snapshot(snapshot)?;
            let embedder = config.build_embedder().context("building embedder")?;
            let gate = config
                .build_rerank_gate(rerank)
                .context("building rerank gate")?;
            let session = SearchSession::build_with_batch_size(
                listings,
                embedder,
                config.fusion,
                config.embedding.batch_size,
            )?;
            evaluation::run_pipeline_evaluation(&cases, &session, &gate, &settings)?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}
