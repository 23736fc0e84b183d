//! Search binary entry point.
//!
//! Command-line interface over the paper search service. Supports a single
//! text query, a "more like this" lookup by paper id and an interactive REPL,
//! with table or JSON output.
//!
//! # Examples
//!
//! Single query:
//! ```bash
//! search --query "graph neural networks"
//! ```
//!
//! Filtered JSON output:
//! ```bash
//! search --query "kernel scheduling" --category cs.OS --format json
//! ```
//!
//! Papers similar to a stored one:
//! ```bash
//! search --similar-to 6f1c2a9e-1d0b-4c57-9a43-2d1c0f3e8b11
//! ```
//!
//! Interactive mode:
//! ```bash
//! search --interactive
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use research_hub::{
    config::Settings,
    embedding::{fastembed::FastEmbedProvider, EmbeddingGenerator},
    manager::VectorStoreManager,
    models::{SearchResult, SimilarPaper},
    service::{PaperSearchService, SearchRequest, SimilarPapersRequest, MAX_RESULT_LIMIT},
    storage::qdrant::{QdrantConfig, QdrantStore},
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Service = PaperSearchService<FastEmbedProvider, QdrantStore>;

/// Output format for search results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Search CLI for querying the paper collection
#[derive(Parser, Debug)]
#[command(
    name = "search",
    version,
    about = "Search research papers by semantic similarity",
    long_about = "Query the paper collection with free text, or find papers similar to a stored \
                  one. Supports single-query and interactive modes.

EXAMPLES:
  Single query:
    search --query \"neural networks\"

  Category filter with JSON output:
    search --query \"transformers\" --category cs.CL --format json

  More like this:
    search --similar-to <PAPER_ID> --limit 10

  Interactive mode:
    search --interactive"
)]
struct Args {
    /// Search query
    #[arg(long, short = 'q', value_name = "TEXT", conflicts_with_all = ["interactive", "similar_to"])]
    query: Option<String>,

    /// Find papers similar to the paper with this id
    #[arg(long, value_name = "ID", conflicts_with = "interactive")]
    similar_to: Option<String>,

    /// Number of results to return
    #[arg(long, short = 'n', value_name = "N", default_value = "10")]
    limit: usize,

    /// Only return papers tagged with this category
    #[arg(long, value_name = "CATEGORY")]
    category: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Qdrant URL (overrides QDRANT_URL / QDRANT_HOST / QDRANT_PORT)
    #[arg(long, value_name = "URL")]
    qdrant_url: Option<String>,

    /// Collection name (overrides PAPERS_COLLECTION)
    #[arg(long, value_name = "NAME")]
    collection: Option<String>,

    /// FastEmbed model cache directory (overrides FASTEMBED_CACHE_DIR)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

async fn build_service(args: &Args) -> Result<Service> {
    let mut settings = Settings::from_env().context("Invalid environment configuration")?;
    if let Some(url) = &args.qdrant_url {
        let api_key = settings.qdrant.api_key.take();
        settings.qdrant = QdrantConfig::new(url.clone());
        settings.qdrant.api_key = api_key;
    }
    if let Some(collection) = &args.collection {
        settings.collection.name = collection.clone();
    }
    if let Some(dir) = &args.cache_dir {
        settings.embedding.cache_dir = Some(dir.clone());
    }

    let provider = FastEmbedProvider::new(&settings.embedding.model_name, settings.embedding.cache_dir.clone())
        .context("Failed to create FastEmbed provider")?;
    let generator = EmbeddingGenerator::new(provider);
    let embedding = generator.config();
    info!(model = %embedding.model_name, dimension = embedding.dimension, "Embedding model ready");

    let mut collection = settings.collection;
    collection.dimension = embedding.dimension;

    let store = QdrantStore::new(&settings.qdrant).context("Failed to create Qdrant client")?;
    let manager = VectorStoreManager::connect(store, collection, settings.retry)
        .await
        .with_context(|| format!("Failed to connect to Qdrant at {}", settings.qdrant.url))?;

    Ok(PaperSearchService::new(generator, manager))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn score_color(score: f32) -> Color {
    if score >= 0.8 {
        Color::Green
    } else if score >= 0.6 {
        Color::Cyan
    } else if score >= 0.4 {
        Color::Yellow
    } else {
        Color::White
    }
}

fn new_table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

/// Format search hits as a pretty table
fn format_results_table(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = new_table(&["Rank", "Title", "Authors", "Categories", "Score"]);
    for (idx, result) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(truncate(&result.title, 60)),
            Cell::new(truncate(&result.authors.join(", "), 40)),
            Cell::new(result.categories.join(", ")),
            Cell::new(format!("{:.4}", result.score)).fg(score_color(result.score)),
        ]);
    }
    table.to_string()
}

/// Format similar papers as a pretty table
fn format_similar_table(results: &[SimilarPaper]) -> String {
    if results.is_empty() {
        return "No similar papers found.".to_string();
    }

    let mut table = new_table(&["Rank", "Id", "Title", "Score"]);
    for (idx, paper) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&paper.id),
            Cell::new(truncate(&paper.title, 60)),
            Cell::new(format!("{:.4}", paper.score)).fg(score_color(paper.score)),
        ]);
    }
    table.to_string()
}

/// Display detailed view of a single result
fn display_result_detail(result: &SearchResult, rank: usize) {
    println!("\n{}", "═".repeat(80));
    println!("Rank: {}", rank);
    println!("Id: {}", result.id);
    println!("Title: {}", result.title);
    println!("Authors: {}", result.authors.join(", "));
    println!("Categories: {}", result.categories.join(", "));
    println!("Score: {:.4}", result.score);
    println!("\nAbstract:\n{}", result.abstract_text);
    println!("{}", "═".repeat(80));
}

async fn run_search(
    service: &Service,
    query: &str,
    limit: usize,
    category: Option<&str>,
    format: OutputFormat,
) -> Result<Vec<SearchResult>> {
    debug!("Executing search for query: {}", query);
    let mut request = SearchRequest::new(query).with_limit(limit);
    if let Some(category) = category {
        request = request.with_category(category);
    }

    let start = Instant::now();
    let response = service
        .search(request)
        .await
        .with_context(|| format!("Failed to execute search for query: '{}'", query))?;
    let elapsed = start.elapsed();

    match format {
        OutputFormat::Table => {
            println!("{}", format_results_table(&response.results));
            println!("\nFound {} results in {:.2}s", response.total_found, elapsed.as_secs_f64());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&response).context("Failed to serialize results to JSON")?;
            println!("{}", json);
        }
    }

    Ok(response.results)
}

async fn run_similar(service: &Service, paper_id: &str, limit: usize, format: OutputFormat) -> Result<()> {
    let response = service
        .similar(SimilarPapersRequest::new(paper_id).with_limit(limit))
        .await
        .with_context(|| format!("Failed to find papers similar to '{}'", paper_id))?;

    match format {
        OutputFormat::Table => {
            println!("Papers similar to {}", response.similar_to);
            println!("{}", format_similar_table(&response.results));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&response).context("Failed to serialize results to JSON")?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  <query>              - Search for papers");
    println!("  /limit N             - Set number of results to N (1-{})", MAX_RESULT_LIMIT);
    println!("  /category NAME       - Only show papers in category NAME");
    println!("  /category clear      - Clear category filter");
    println!("  /similar ID          - Show papers similar to paper ID");
    println!("  /format table|json   - Set output format");
    println!("  /detail N            - Show full details for result rank N");
    println!("  /help                - Show this help");
    println!("  Ctrl+D or Ctrl+C     - Exit");
}

/// Run interactive REPL mode
async fn run_interactive(
    service: Service,
    mut limit: usize,
    mut category: Option<String>,
    mut format: OutputFormat,
) -> Result<()> {
    println!("Interactive Paper Search");
    print_help();
    println!();

    let mut rl = DefaultEditor::new().context("Failed to create readline editor")?;
    let mut last_results: Vec<SearchResult> = Vec::new();

    loop {
        let line = match rl.readline("Search> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line).ok();

        if !line.starts_with('/') {
            match run_search(&service, line, limit, category.as_deref(), format).await {
                Ok(results) => last_results = results,
                Err(e) => eprintln!("Search failed: {:#}", e),
            }
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["/help"] => print_help(),
            ["/limit", n] => match n.parse::<usize>() {
                Ok(n) if (1..=MAX_RESULT_LIMIT).contains(&n) => {
                    limit = n;
                    println!("Set limit to {}", limit);
                }
                _ => eprintln!("Invalid number: must be between 1 and {}", MAX_RESULT_LIMIT),
            },
            ["/category", "clear"] => {
                category = None;
                println!("Cleared category filter");
            }
            ["/category", name] => {
                category = Some(name.to_string());
                println!("Set category filter: {}", name);
            }
            ["/similar", id] => {
                if let Err(e) = run_similar(&service, id, limit, format).await {
                    eprintln!("Lookup failed: {:#}", e);
                }
            }
            ["/format", "table"] => {
                format = OutputFormat::Table;
                println!("Set output format to table");
            }
            ["/format", "json"] => {
                format = OutputFormat::Json;
                println!("Set output format to JSON");
            }
            ["/detail", n] => match n.parse::<usize>() {
                Ok(rank) if rank > 0 && rank <= last_results.len() => {
                    display_result_detail(&last_results[rank - 1], rank);
                }
                Ok(rank) if rank > last_results.len() => {
                    eprintln!("Rank {} out of range (last search had {} results)", rank, last_results.len());
                }
                _ => eprintln!("Invalid rank: must be a positive integer"),
            },
            [command, ..] => eprintln!("Unknown or malformed command: {}. Type /help for usage.", command),
            [] => {}
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    if !args.interactive && args.query.is_none() && args.similar_to.is_none() {
        anyhow::bail!(
            "One of --query, --similar-to or --interactive must be specified.\n\
             Use --help for usage information."
        );
    }
    if args.limit == 0 || args.limit > MAX_RESULT_LIMIT {
        anyhow::bail!("--limit must be between 1 and {}", MAX_RESULT_LIMIT);
    }

    let service = build_service(&args).await?;

    if args.interactive {
        run_interactive(service, args.limit, args.category, args.format).await?;
    } else if let Some(paper_id) = &args.similar_to {
        run_similar(&service, paper_id, args.limit, args.format).await?;
    } else if let Some(query) = &args.query {
        run_search(&service, query, args.limit, args.category.as_deref(), args.format).await?;
    }

    Ok(())
}
