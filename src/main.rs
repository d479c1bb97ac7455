//! Vectra CLI - Command-line interface for the relational vector store

use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vectra::config::{self, Overrides, VectraConfig};
use vectra::ui::{self, Icons};
use vectra::{
    ExactMatchFilter, FilterValue, MetadataFilters, NodeRecord, NodeWithEmbedding, QueryMode,
    SqliteVectorStore, TextSearchConfig, VectorStore, VectorStoreQuery,
};

#[derive(Parser)]
#[command(name = "vectra")]
#[command(version)]
#[command(about = "Relational vector store - dense, sparse and hybrid retrieval over SQLite")]
#[command(long_about = r#"
Vectra stores embeddings with their text and metadata in SQLite and answers:
  • Dense queries (cosine distance over embeddings)
  • Sparse queries (lexical search, needs --hybrid)
  • Hybrid queries (dense results followed by sparse results)

Example usage:
  vectra --hybrid --embed-dim 2 add --input records.jsonl
  vectra query --embedding 0.1,1 --text "who is the fox?" --mode hybrid --top-k 2
  vectra delete --ref-doc-id bbb
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Logical table name
    #[arg(short, long, global = true)]
    table: Option<String>,

    /// Embedding dimensionality
    #[arg(long, global = true)]
    embed_dim: Option<usize>,

    /// Maintain the lexeme index for sparse and hybrid queries
    #[arg(long, global = true)]
    hybrid: bool,

    /// Text analysis for the lexeme index (english, simple)
    #[arg(long, global = true)]
    text_search_config: Option<TextSearchConfig>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the current settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Add records from a JSON Lines file
    Add {
        /// One record per line: {"id", "text", "embedding", "metadata"?, "ref_doc_id"?}
        #[arg(short, long)]
        input: PathBuf,

        /// Records written per transaction
        #[arg(long, default_value = "64")]
        batch_size: usize,
    },

    /// Query the store
    Query {
        /// Query embedding, comma separated
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        embedding: Vec<f32>,

        /// Query text for sparse and hybrid modes
        #[arg(long)]
        text: Option<String>,

        /// Retrieval mode (default, sparse, hybrid)
        #[arg(short, long, default_value = "default")]
        mode: QueryMode,

        /// Maximum number of dense results
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Maximum number of sparse results (defaults to --top-k)
        #[arg(long)]
        sparse_top_k: Option<usize>,

        /// Exact-match metadata filter, key=value (repeatable)
        #[arg(short = 'F', long = "filter", value_parser = parse_filter)]
        filters: Vec<ExactMatchFilter>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Delete every record of a source document
    Delete {
        /// Source document id
        #[arg(short, long)]
        ref_doc_id: String,
    },

    /// Show statistics about the store
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_filter(raw: &str) -> Result<ExactMatchFilter, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))?;
    if key.is_empty() {
        return Err(format!("empty filter key in {:?}", raw));
    }
    Ok(ExactMatchFilter::new(key, FilterValue::parse_loose(value)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let file_config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let overrides = Overrides {
        database: cli.database.clone(),
        table_name: cli.table.clone(),
        embed_dim: cli.embed_dim,
        hybrid_search: cli.hybrid,
        text_search_config: cli.text_search_config,
    };
    let params = file_config.store_params(&overrides);

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let written = VectraConfig {
                database: Some(params.database.to_string_lossy().to_string()),
                table_name: Some(params.table_name.clone()),
                embed_dim: Some(params.embed_dim),
                hybrid_search: Some(params.hybrid_search),
                text_search_config: Some(params.text_search_config),
            };
            config::write_config(&path, &written, force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Add { input, batch_size } => {
            let store = SqliteVectorStore::from_params(params)?;
            let file = std::fs::File::open(&input)?;

            let mut records: Vec<NodeWithEmbedding> = Vec::new();
            for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: NodeRecord = serde_json::from_str(&line)
                    .map_err(|e| anyhow::anyhow!("{}:{}: {}", input.display(), index + 1, e))?;
                records.push(record.into());
            }

            if records.is_empty() {
                ui::warn("No records found in input.");
                return Ok(());
            }

            ui::header(&format!("Adding {} records to {}", records.len(), store.data_table()));
            let started = Instant::now();
            let progress = ui::IngestProgress::new(records.len());
            let mut batches = 0;
            for chunk in records.chunks(batch_size.max(1)) {
                let ids = store.async_add(chunk).await?;
                progress.inc(ids.len());
                if let Some(last) = ids.last() {
                    progress.set_message(last);
                }
                batches += 1;
            }
            progress.finish_with_summary(started.elapsed(), records.len(), batches);
            store.close().await?;
        }

        Commands::Query {
            embedding,
            text,
            mode,
            top_k,
            sparse_top_k,
            filters,
            format,
        } => {
            let store = SqliteVectorStore::from_params(params)?;

            let mut query = VectorStoreQuery {
                query_embedding: (!embedding.is_empty()).then_some(embedding),
                query_str: text,
                similarity_top_k: top_k,
                sparse_top_k,
                mode,
                ..VectorStoreQuery::default()
            };
            if !filters.is_empty() {
                query = query.with_filters(MetadataFilters::new(filters));
            }

            let icon = match mode {
                QueryMode::Default => Icons::VECTOR,
                QueryMode::Sparse => Icons::TEXT,
                QueryMode::Hybrid => Icons::FUSION,
            };
            tracing::debug!("Running {} query against {}", mode, store.data_table());

            let spinner = ui::Spinner::new("Searching...");
            let result = store.aquery(&query).await;
            spinner.finish_and_clear();
            let result = result?;

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.is_empty() {
                println!("{} No records found.", Icons::CROSS);
            } else {
                println!("{} {} results ({} mode)", icon, result.len(), mode);
                for (rank, (node, score)) in result.nodes.iter().zip(&result.similarities).enumerate() {
                    ui::result_row(rank + 1, &node.id, *score, &node.text);
                }
            }
            store.close().await?;
        }

        Commands::Delete { ref_doc_id } => {
            let store = SqliteVectorStore::from_params(params)?;
            let before = store.count()?;
            store.adelete(&ref_doc_id).await?;
            let removed = before.saturating_sub(store.count()?);

            println!(
                "{} Removed {} records of document {}",
                Icons::DEL,
                removed,
                ref_doc_id.bold()
            );
            store.close().await?;
        }

        Commands::Stats => {
            let database = params.database.clone();
            let store = SqliteVectorStore::from_params(params)?;
            let stats = store.stats()?;

            println!("{} Vectra Statistics ({})", Icons::STATS, database.display());
            ui::info("Database", &format!("{} {}", Icons::DATABASE, database.display()));
            println!("{}", ui::stats_table(&stats));
            store.close().await?;
        }
    }

    Ok(())
}
