//! Ingestion job persistence
//!
//! Append-only: jobs are inserted once and updated in place through their
//! state transitions, never deleted. The (source_ref, created_at) index
//! backs the latest-job lookup used for idempotent re-ingestion.

use crate::models::{IngestJob, JobStatus};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Insert a new job row
pub async fn insert_job(pool: &SqlitePool, job: &IngestJob) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ingest_jobs (id, source_ref, item_id, status, error, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job.id.to_string())
    .bind(&job.source_ref)
    .bind(job.item_id)
    .bind(job.status.as_str())
    .bind(&job.error)
    .bind(job.created_at.to_rfc3339())
    .bind(job.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a job's current status, error, and resolved item id
pub async fn update_job(pool: &SqlitePool, job: &IngestJob) -> Result<()> {
    sqlx::query(
        "UPDATE ingest_jobs SET item_id = ?, status = ?, error = ?, updated_at = ? WHERE id = ?",
    )
    .bind(job.item_id)
    .bind(job.status.as_str())
    .bind(&job.error)
    .bind(Utc::now().to_rfc3339())
    .bind(job.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a job by id
pub async fn load_job(pool: &SqlitePool, job_id: Uuid) -> Result<Option<IngestJob>> {
    let row = sqlx::query(
        "SELECT id, source_ref, item_id, status, error, created_at, updated_at
         FROM ingest_jobs WHERE id = ?",
    )
    .bind(job_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(parse_job_row).transpose()
}

/// Most recent job for a source reference, if any
pub async fn load_latest_job(pool: &SqlitePool, source_ref: &str) -> Result<Option<IngestJob>> {
    let row = sqlx::query(
        "SELECT id, source_ref, item_id, status, error, created_at, updated_at
         FROM ingest_jobs WHERE source_ref = ?
         ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(source_ref)
    .fetch_optional(pool)
    .await?;

    row.map(parse_job_row).transpose()
}

/// Count jobs currently in a given status
pub async fn count_jobs_in_status(pool: &SqlitePool, status: JobStatus) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM ingest_jobs WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

fn parse_job_row(row: sqlx::sqlite::SqliteRow) -> Result<IngestJob> {
    let id_str: String = row.get("id");
    let status_str: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(IngestJob {
        id: Uuid::parse_str(&id_str)?,
        source_ref: row.get("source_ref"),
        item_id: row.get("item_id"),
        status: JobStatus::parse(&status_str)
            .ok_or_else(|| anyhow!("Unknown job status: {}", status_str))?,
        error: row.get("error"),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)?.with_timezone(&Utc),
    })
}
