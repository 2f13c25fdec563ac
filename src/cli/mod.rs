//! Command-line surface for `dgit`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cache::{FileStore, MemoryStore, ResultCache, file::dgit_cache_dir};
use crate::entities::EntityType;
use crate::entities::alias::AliasTables;
use crate::entities::ask;
use crate::entities::lookup::Resolver;
use crate::error::DgitError;
use crate::render;
use crate::sources::LiveUpstream;
use crate::sources::gemini::GeminiClient;
use crate::sources::ncbi_gene::NcbiGeneClient;

pub mod health;

#[derive(Debug, Parser)]
#[command(
    name = "dgit",
    version,
    about = "Look up gene-drug interactions and protein records for a fixed research focus"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print JSON instead of markdown.
    #[arg(long, global = true)]
    pub json: bool,

    /// JSON file whose gene/protein/drug sections replace the built-in alias tables.
    #[arg(long, global = true, value_name = "FILE")]
    pub aliases: Option<PathBuf>,

    /// Keep cached lookups in memory only for this run.
    #[arg(long, global = true)]
    pub memory_cache: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Look up a gene, protein, or drug. An empty query lists the defaults.
    Search {
        /// gene, protein, or drug
        entity_type: String,
        query: Vec<String>,
    },
    /// NCBI gene summary for a symbol or alias.
    Summary { term: Vec<String> },
    /// Ask a question; a gene it mentions is looked up for context.
    Ask { question: Vec<String> },
    /// Explain a free-text query.
    Explain { query: Vec<String> },
    /// Check connectivity to the upstream APIs and the cache directory.
    Health {
        #[arg(long)]
        apis_only: bool,
    },
}

struct Context {
    json: bool,
    aliases: Arc<AliasTables>,
    memory_cache: bool,
}

impl Context {
    fn from_cli(cli: &Cli) -> Result<Self, DgitError> {
        let aliases = match cli.aliases.as_deref() {
            Some(path) => AliasTables::from_json_file(path)?,
            None => AliasTables::default(),
        };
        Ok(Self {
            json: cli.json,
            aliases: Arc::new(aliases),
            memory_cache: cli.memory_cache,
        })
    }

    fn cache(&self) -> ResultCache {
        if self.memory_cache {
            ResultCache::new(Arc::new(MemoryStore::default()))
        } else {
            ResultCache::new(Arc::new(FileStore::new(dgit_cache_dir())))
        }
    }

    fn resolver(&self) -> Result<Resolver, DgitError> {
        let cache = self.cache();
        debug!(cache = %cache.describe(), "lookup cache");
        Ok(Resolver::new(
            self.aliases.clone(),
            Arc::new(LiveUpstream::new()?),
            cache,
        ))
    }
}

fn joined(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}

#[derive(serde::Serialize)]
struct SummaryOutput<'a> {
    term: &'a str,
    summary: Option<&'a str>,
}

async fn run_summary(ctx: &Context, term: &str) -> Result<String, DgitError> {
    let symbol = ctx.aliases.normalize(EntityType::Gene, term);
    if symbol.is_empty() {
        return Err(DgitError::InvalidArgument("Gene symbol is required".into()));
    }
    let summary = NcbiGeneClient::new()?.summary(&symbol).await;
    if ctx.json {
        return render::json::to_pretty(&SummaryOutput {
            term: &symbol,
            summary: summary.as_deref(),
        });
    }
    render::markdown::summary_markdown(&symbol, summary.as_deref())
}

/// Executes one parsed command and returns the text to print.
///
/// # Errors
///
/// Returns the underlying [`DgitError`] (wrapped in `anyhow`) for invalid
/// input, upstream failures, and rendering errors.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let ctx = Context::from_cli(&cli)?;

    let output = match cli.command {
        Commands::Search { entity_type, query } => {
            let resolution = ctx
                .resolver()?
                .resolve(&entity_type, &joined(&query))
                .await?;
            if ctx.json {
                render::json::to_pretty(&resolution)?
            } else {
                render::markdown::resolution_markdown(&resolution)?
            }
        }
        Commands::Summary { term } => run_summary(&ctx, &joined(&term)).await?,
        Commands::Ask { question } => {
            let answer = ask::ask(
                &ctx.resolver()?,
                &NcbiGeneClient::new()?,
                &GeminiClient::new()?,
                &joined(&question),
            )
            .await?;
            if ctx.json {
                render::json::to_pretty(&answer)?
            } else {
                render::markdown::answer_markdown(&answer)?
            }
        }
        Commands::Explain { query } => {
            let answer = ask::explain_query(&GeminiClient::new()?, &joined(&query)).await?;
            if ctx.json {
                render::json::to_pretty(&answer)?
            } else {
                render::markdown::answer_markdown(&answer)?
            }
        }
        Commands::Health { apis_only } => {
            let cache_dir = (!apis_only && !ctx.memory_cache).then(dgit_cache_dir);
            let report = health::check(cache_dir.as_deref()).await?;
            if ctx.json {
                render::json::to_pretty(&report)?
            } else {
                report.to_markdown()
            }
        }
    };
    Ok(output)
}
