//! Ingestion orchestration
//!
//! Sequences fetch → extract → fuse → persist against a durable job
//! record. Two paths:
//! - **Quick**: fetch and persist metadata only, then return, so callers
//!   can display the item without waiting on inference latency.
//! - **Complete**: facet extraction (parallel across facets), embedding
//!   fusion (parallel across facets), and persistence, then `succeeded`.
//!   Runs detached from the triggering request; any error escaping the
//!   body is captured on the job row as `failed` and swallowed, never
//!   propagated to the already-returned caller.
//!
//! Job status is monotonic: a job never leaves a terminal state, and every
//! running job reaches one.

use crate::db;
use crate::extractors::{select_representative_images, FacetExtractor};
use crate::fusion::{EmbedError, FacetEmbedder};
use crate::models::{CatalogItem, IngestJob, JobStatus};
use crate::services::catalog_client::{CatalogSource, FetchError};
use crate::types::Facet;
use crate::utils::{retry_with_backoff, RetryPolicy};
use anyhow::{anyhow, bail, Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome handed back by `ingest`: the job plus either the resolved item
/// or the quick-phase error
#[derive(Debug)]
pub struct IngestTicket {
    pub job_id: Uuid,
    pub item_id: Option<i64>,
    pub error: Option<String>,
    /// Handle to the detached complete path, present when this call
    /// spawned one. Short-lived callers must await it before dropping the
    /// runtime, or the job is aborted mid-flight and stays `running`.
    pub task: Option<tokio::task::JoinHandle<()>>,
}

/// Ingestion pipeline orchestrator
pub struct IngestOrchestrator {
    db: SqlitePool,
    catalog: Arc<dyn CatalogSource>,
    extractor: Arc<FacetExtractor>,
    embedder: Arc<FacetEmbedder>,
    retry: RetryPolicy,
}

impl IngestOrchestrator {
    pub fn new(
        db: SqlitePool,
        catalog: Arc<dyn CatalogSource>,
        extractor: Arc<FacetExtractor>,
        embedder: Arc<FacetEmbedder>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            db,
            catalog,
            extractor,
            embedder,
            retry,
        }
    }

    /// Quick path: fetch and persist metadata, nothing more.
    pub async fn quick_ingest(&self, source_ref: &str) -> Result<CatalogItem> {
        let item_id = parse_source_ref(source_ref)?;
        let item = self.fetch_item(item_id).await?;
        db::items::save_item(&self.db, &item).await?;
        Ok(item)
    }

    /// Full ingestion: quick phase inline, then the complete path detached.
    ///
    /// Returns once metadata is persisted (or the quick phase failed). The
    /// detached enrichment reports through the job row; the ticket carries
    /// its join handle so callers that are about to exit can await it.
    pub async fn ingest(self: &Arc<Self>, source_ref: &str) -> Result<IngestTicket> {
        // Idempotent re-ingestion: a non-terminal job for the same source
        // is already doing this work, so hand back its ticket
        if let Some(existing) = db::jobs::load_latest_job(&self.db, source_ref).await? {
            if !existing.status.is_terminal() {
                tracing::info!(
                    job_id = %existing.id,
                    source_ref,
                    "Reusing in-flight ingestion job"
                );
                return Ok(IngestTicket {
                    job_id: existing.id,
                    item_id: existing.item_id,
                    error: None,
                    task: None,
                });
            }
        }

        let mut job = IngestJob::new_running(source_ref.to_string());
        db::jobs::insert_job(&self.db, &job).await?;

        tracing::info!(job_id = %job.id, source_ref, "Starting ingestion");

        // Quick phase, inline so the caller gets the item id or the error
        let item = match self.quick_ingest(source_ref).await {
            Ok(item) => item,
            Err(e) => {
                let message = e.to_string();
                job.fail(message.clone());
                db::jobs::update_job(&self.db, &job).await?;
                tracing::warn!(job_id = %job.id, error = %message, "Quick phase failed");
                return Ok(IngestTicket {
                    job_id: job.id,
                    item_id: None,
                    error: Some(message),
                    task: None,
                });
            }
        };

        job.item_id = Some(item.id);
        db::jobs::update_job(&self.db, &job).await?;

        // Detached complete path; failures land on the job row only
        let orchestrator = Arc::clone(self);
        let job_id = job.id;
        let item_id = item.id;
        let task = tokio::spawn(async move {
            orchestrator.run_complete_path(job, item).await;
        });

        Ok(IngestTicket {
            job_id,
            item_id: Some(item_id),
            error: None,
            task: Some(task),
        })
    }

    /// Job status lookup for polling callers
    pub async fn job_status(&self, job_id: Uuid) -> Result<Option<IngestJob>> {
        db::jobs::load_job(&self.db, job_id).await
    }

    /// Supervised complete-path body: whatever happens, the job ends in a
    /// terminal state.
    async fn run_complete_path(&self, mut job: IngestJob, item: CatalogItem) {
        match self.complete(&item).await {
            Ok(persisted) => {
                job.transition_to(JobStatus::Succeeded);
                tracing::info!(
                    job_id = %job.id,
                    item_id = item.id,
                    facets_persisted = persisted,
                    "Ingestion completed"
                );
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, item_id = item.id, error = %e, "Ingestion failed");
                job.fail(e.to_string());
            }
        }

        if let Err(e) = db::jobs::update_job(&self.db, &job).await {
            // Nothing left to report to; the job row stays stale
            tracing::error!(job_id = %job.id, error = %e, "Failed to persist terminal job state");
        }
    }

    /// Extraction, fusion, and persistence for every facet.
    ///
    /// Per-facet failures degrade coverage; the pipeline errors only when
    /// not a single facet could be embedded.
    async fn complete(&self, item: &CatalogItem) -> Result<usize> {
        let images = select_representative_images(&item.images);

        let descriptions = self.extractor.describe_facets(item, &images).await;

        // Embed all facets without waiting on each other
        let embeddings = futures::future::join_all(Facet::ALL.into_iter().map(|facet| {
            let descriptions = &descriptions;
            let images = &images;
            async move {
                let result = self
                    .embedder
                    .embed_facet(item.id, facet, descriptions.get(facet), images)
                    .await;
                (facet, result)
            }
        }))
        .await;

        let mut persisted = 0usize;
        for (facet, result) in embeddings {
            match result {
                Ok(embedding) => {
                    self.save_embedding_with_retry(&embedding)
                        .await
                        .with_context(|| format!("persisting {} embedding", facet))?;
                    persisted += 1;
                }
                Err(EmbedError::NoInputs(_)) => {
                    tracing::debug!(item_id = item.id, facet = %facet, "Facet has no inputs, skipping");
                }
                Err(e) => {
                    tracing::warn!(
                        item_id = item.id,
                        facet = %facet,
                        error = %e,
                        "Facet embedding failed, coverage degraded"
                    );
                }
            }
        }

        if persisted == 0 {
            bail!("No facet could be embedded for item {}", item.id);
        }
        Ok(persisted)
    }

    async fn fetch_item(&self, item_id: i64) -> Result<CatalogItem> {
        retry_with_backoff(
            "catalog fetch",
            self.retry,
            FetchError::is_retryable,
            || self.catalog.fetch(item_id),
        )
        .await
        .map_err(|e| anyhow!(e))
    }

    async fn save_embedding_with_retry(
        &self,
        embedding: &crate::models::FacetEmbedding,
    ) -> Result<()> {
        retry_with_backoff(
            "embedding upsert",
            self.retry,
            // Transient sqlite contention only; anything else is fatal
            |e: &anyhow::Error| e.to_string().contains("database is locked"),
            || db::embeddings::save_embedding(&self.db, embedding),
        )
        .await
    }
}

/// Source references are the upstream numeric item keys
fn parse_source_ref(source_ref: &str) -> Result<i64> {
    source_ref
        .trim()
        .parse::<i64>()
        .map_err(|_| anyhow!("Invalid source reference: {}", source_ref))
}
