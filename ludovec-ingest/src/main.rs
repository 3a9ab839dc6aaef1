//! ludovec-ingest - item embedding pipeline CLI
//!
//! Thin command-line front over the library: ingest items, check job
//! status, and rank similar items.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use ludovec_ingest::extractors::FacetExtractor;
use ludovec_ingest::fusion::FacetEmbedder;
use ludovec_ingest::models::FacetWeights;
use ludovec_ingest::services::{CatalogClient, InferenceGateway};
use ludovec_ingest::{IngestConfig, IngestOrchestrator, SimilarityRanker};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "ludovec-ingest", version, about = "Multi-facet item embedding pipeline")]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full ingestion: metadata, then facet embeddings; runs to completion
    Ingest {
        /// Catalog item id
        source_ref: String,
    },
    /// Metadata-only ingestion
    Quick {
        /// Catalog item id
        source_ref: String,
    },
    /// Show the state of an ingestion job
    Status {
        /// Job id (UUID)
        job_id: Uuid,
    },
    /// Rank items similar to an already-ingested item
    Rank {
        /// Catalog item id of the source
        item_id: i64,
        /// Weight preset: balanced, looks, feels, plays, story
        #[arg(long, default_value = "balanced")]
        preset: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0.0)]
        threshold: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = IngestConfig::load(cli.config.as_deref())?;

    info!(database = %config.database_path.display(), "Starting ludovec-ingest");
    let db_pool = ludovec_ingest::db::init_database_pool(&config.database_path).await?;

    match cli.command {
        Command::Ingest { source_ref } => {
            let orchestrator = build_orchestrator(&config, db_pool)?;
            let mut ticket = orchestrator.ingest(&source_ref).await?;
            if let Some(error) = ticket.error {
                return Err(anyhow!("Ingestion failed: {}", error));
            }
            println!("job {} started for item {:?}", ticket.job_id, ticket.item_id);

            // Exiting before the background phase finishes would abort it
            // and leave the job stuck in `running`
            if let Some(task) = ticket.task.take() {
                task.await?;
            }
            let job = wait_for_terminal(&orchestrator, ticket.job_id).await?;
            println!("job {} finished: {}", job.id, job.status.as_str());
            if let Some(error) = job.error {
                return Err(anyhow!("Ingestion failed: {}", error));
            }
        }
        Command::Quick { source_ref } => {
            let orchestrator = build_orchestrator(&config, db_pool)?;
            let item = orchestrator.quick_ingest(&source_ref).await?;
            println!("ingested {} ({})", item.title, item.id);
        }
        Command::Status { job_id } => {
            let job = ludovec_ingest::db::jobs::load_job(&db_pool, job_id)
                .await?
                .ok_or_else(|| anyhow!("No job with id {}", job_id))?;
            println!(
                "job {}: {} (source {}, item {:?})",
                job.id,
                job.status.as_str(),
                job.source_ref,
                job.item_id
            );
            if let Some(error) = job.error {
                println!("error: {}", error);
            }
        }
        Command::Rank {
            item_id,
            preset,
            limit,
            threshold,
        } => {
            let weights = FacetWeights::preset(&preset)
                .ok_or_else(|| anyhow!("Unknown weight preset: {}", preset))?;
            let ranker = SimilarityRanker::new(db_pool);
            let matches = ranker.rank(item_id, &weights, limit, threshold).await?;
            for m in matches {
                println!("{:>10}  {:.4}", m.item_id, m.weighted);
            }
        }
    }

    Ok(())
}

fn build_orchestrator(
    config: &IngestConfig,
    db_pool: sqlx::SqlitePool,
) -> Result<Arc<IngestOrchestrator>> {
    let api_key = config
        .inference_api_key
        .clone()
        .ok_or_else(|| anyhow!("inference_api_key is not configured"))?;

    let gateway = Arc::new(InferenceGateway::new(
        config.inference_base_url.clone(),
        api_key,
        config.models.clone(),
    )?);

    let catalog = Arc::new(CatalogClient::new(
        config.catalog_base_url.clone(),
        config.tags_base_url.clone(),
        config.catalog_min_interval_ms,
    )?);

    let retry = config.retry;
    let extractor = Arc::new(FacetExtractor::new(
        gateway.clone(),
        gateway.clone(),
        retry,
    ));
    let embedder = Arc::new(FacetEmbedder::new(
        gateway.clone(),
        gateway,
        config.embedding_dim,
        retry,
    ));

    Ok(Arc::new(IngestOrchestrator::new(
        db_pool, catalog, extractor, embedder, retry,
    )))
}

async fn wait_for_terminal(
    orchestrator: &IngestOrchestrator,
    job_id: Uuid,
) -> Result<ludovec_ingest::models::IngestJob> {
    loop {
        if let Some(job) = orchestrator.job_status(job_id).await? {
            if job.status.is_terminal() {
                return Ok(job);
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
