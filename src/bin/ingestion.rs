//! Ingestion binary entry point.
//!
//! Loads paper metadata, embeds it and stores it in the Qdrant collection.
//! Connection settings come from the environment (see `research_hub::config`)
//! and can be overridden on the command line.
//!
//! # Examples
//!
//! Bulk load from a JSON array or JSON-lines file:
//! ```bash
//! ingestion --input papers.json --batch-size 64
//! ```
//!
//! Add a single paper:
//! ```bash
//! ingestion --title "Attention Is All You Need" --abstract "The dominant sequence..." \
//!     --authors "Vaswani,Shazeer" --categories "cs.CL,cs.LG" --date 2017-06-12
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use research_hub::{
    config::Settings,
    embedding::{fastembed::FastEmbedProvider, EmbeddingGenerator},
    ingestion::{IngestionPipeline, DEFAULT_BATCH_SIZE},
    manager::VectorStoreManager,
    provider::{json::JsonFilePaperProvider, PaperProvider},
    service::{AddPaperRequest, PaperSearchService},
    storage::qdrant::{QdrantConfig, QdrantStore},
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Ingestion CLI for loading papers into the vector store
#[derive(Parser, Debug)]
#[command(
    name = "ingestion",
    version,
    about = "Embed research papers and store them in Qdrant",
    long_about = "Embed research papers from their title and abstract and store them, with their \
                  metadata, in a Qdrant collection. The collection is created on first use.

EXAMPLES:
  Bulk load:
    ingestion --input papers.json

  First 500 papers, smaller batches, verbose:
    ingestion --input papers.jsonl --limit 500 --batch-size 32 --log-level debug

  Single paper:
    ingestion --title \"A Paper\" --abstract \"What it is about\" --categories cs.AI"
)]
struct IngestionArgs {
    /// JSON array or JSON-lines file containing paper metadata
    #[arg(short, long, value_name = "FILE", required_unless_present = "title")]
    input: Option<PathBuf>,

    /// Title of a single paper to add
    #[arg(long, value_name = "TEXT", conflicts_with = "input")]
    title: Option<String>,

    /// Abstract of the single paper
    #[arg(long = "abstract", value_name = "TEXT", requires = "title", default_value = "")]
    abstract_text: String,

    /// Comma-separated authors of the single paper
    #[arg(long, value_name = "LIST", value_delimiter = ',', requires = "title")]
    authors: Vec<String>,

    /// Comma-separated categories of the single paper
    #[arg(long, value_name = "LIST", value_delimiter = ',', requires = "title")]
    categories: Vec<String>,

    /// Publication date of the single paper
    #[arg(long, value_name = "DATE", requires = "title", default_value = "")]
    date: String,

    /// Number of papers to embed per model call
    #[arg(long, value_name = "N", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Only ingest the first N papers of the input
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Qdrant URL (overrides QDRANT_URL / QDRANT_HOST / QDRANT_PORT)
    #[arg(long, value_name = "URL")]
    qdrant_url: Option<String>,

    /// Collection name (overrides PAPERS_COLLECTION)
    #[arg(long, value_name = "NAME")]
    collection: Option<String>,

    /// Embedding model name (overrides EMBEDDING_MODEL)
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,

    /// FastEmbed model cache directory (overrides FASTEMBED_CACHE_DIR)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Environment settings with command-line overrides applied
fn load_settings(args: &IngestionArgs) -> Result<Settings> {
    let mut settings = Settings::from_env().context("Invalid environment configuration")?;

    if let Some(url) = &args.qdrant_url {
        let api_key = settings.qdrant.api_key.take();
        settings.qdrant = QdrantConfig::new(url.clone());
        settings.qdrant.api_key = api_key;
    }
    if let Some(collection) = &args.collection {
        settings.collection.name = collection.clone();
    }
    if let Some(model) = &args.model {
        settings.embedding.model_name = model.clone();
    }
    if let Some(dir) = &args.cache_dir {
        settings.embedding.cache_dir = Some(dir.clone());
    }

    Ok(settings)
}

/// Load the model and connect to the store
async fn build_service(settings: Settings) -> Result<PaperSearchService<FastEmbedProvider, QdrantStore>> {
    let provider = FastEmbedProvider::new(&settings.embedding.model_name, settings.embedding.cache_dir.clone())
        .context("Failed to initialize FastEmbed provider")?;
    let generator = EmbeddingGenerator::new(provider);
    let embedding = generator.config();
    info!(model = %embedding.model_name, dimension = embedding.dimension, "Embedding model ready");

    let mut collection = settings.collection;
    collection.dimension = embedding.dimension;

    info!(url = %settings.qdrant.url, collection = %collection.name, "Connecting to Qdrant");
    let store = QdrantStore::new(&settings.qdrant).context("Failed to create Qdrant client")?;
    let manager = VectorStoreManager::connect(store, collection, settings.retry)
        .await
        .context("Failed to connect to Qdrant")?;

    Ok(PaperSearchService::new(generator, manager))
}

/// Create a progress bar for tracking ingestion
fn create_progress_bar(total: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} papers")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

async fn ingest_single(
    service: &PaperSearchService<FastEmbedProvider, QdrantStore>,
    request: AddPaperRequest,
) -> Result<()> {
    let title = request.title.clone();
    let response = service
        .ingest(request)
        .await
        .with_context(|| format!("Failed to add paper '{}'", title))?;

    println!("Added paper {}", response.paper_id);
    println!("Embedding size: {}", response.embedding_size);
    Ok(())
}

async fn ingest_file(
    service: &PaperSearchService<FastEmbedProvider, QdrantStore>,
    input: PathBuf,
    limit: Option<usize>,
    batch_size: usize,
) -> Result<()> {
    let start_time = Instant::now();

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let provider = JsonFilePaperProvider::new(&input);
    let papers = match limit {
        Some(limit) => provider.fetch_papers_limit(limit).await,
        None => provider.fetch_papers().await,
    }
    .with_context(|| format!("Failed to load papers from {}", input.display()))?;
    info!("Found {} papers from {}", papers.len(), provider.name());

    if papers.is_empty() {
        warn!("No papers found in input file");
        return Ok(());
    }

    let pipeline = IngestionPipeline::new(service.embeddings(), service.store(), Some(batch_size));
    debug!("Pipeline created with batch_size={}", pipeline.batch_size());

    let progress = create_progress_bar(papers.len())?;
    let stats = pipeline
        .ingest_batch(&papers, |done| progress.inc(done as u64))
        .await
        .context("Failed to ingest papers")?;
    progress.finish();

    let elapsed = start_time.elapsed();
    println!("\n╔════════════════════════════════════════╗");
    println!("║      Ingestion Completed               ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Total processed:      {:>16} ║", stats.total_processed);
    println!("║ Inserted:             {:>16} ║", stats.inserted);
    println!("║ Failed:               {:>16} ║", stats.failed);
    println!("║ Elapsed time:         {:>13.2?} ║", elapsed);
    println!("╚════════════════════════════════════════╝");

    if stats.failed > 0 {
        warn!("{} papers failed to store - check logs for details", stats.failed);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = IngestionArgs::parse();
    init_logging(&args.log_level);
    debug!("CLI arguments: {:?}", args);

    let settings = load_settings(&args)?;
    let service = build_service(settings).await?;

    match (args.input, args.title) {
        (Some(input), _) => ingest_file(&service, input, args.limit, args.batch_size).await?,
        (None, Some(title)) => {
            let request = AddPaperRequest {
                title,
                abstract_text: args.abstract_text,
                authors: args.authors,
                publication_date: args.date,
                categories: args.categories,
            };
            ingest_single(&service, request).await?
        }
        (None, None) => anyhow::bail!("Either --input or --title must be specified"),
    }

    info!("Ingestion finished");
    Ok(())
}
