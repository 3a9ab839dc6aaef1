//! Database access for ludovec-ingest
//!
//! SQLite via sqlx. Vectors and provenance are stored as JSON text; the
//! tables are small enough that similarity queries load candidate vectors
//! and score them in process.

pub mod embeddings;
pub mod items;
pub mod jobs;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the ludovec tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Latest metadata per catalog item
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            item_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            short_text TEXT NOT NULL DEFAULT '',
            long_text TEXT NOT NULL DEFAULT '',
            images TEXT NOT NULL DEFAULT '[]',
            tags TEXT NOT NULL DEFAULT '{}',
            genres TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One embedding per item x facet
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS item_embeddings (
            item_id INTEGER NOT NULL,
            facet TEXT NOT NULL,
            vector TEXT NOT NULL,
            source_type TEXT NOT NULL,
            provenance TEXT NOT NULL DEFAULT '{}',
            model TEXT NOT NULL,
            version TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (item_id, facet)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only job log; latest-job lookup goes through this index
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingest_jobs (
            id TEXT PRIMARY KEY,
            source_ref TEXT NOT NULL,
            item_id INTEGER,
            status TEXT NOT NULL,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingest_jobs_source
         ON ingest_jobs (source_ref, created_at)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (items, item_embeddings, ingest_jobs)");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    init_tables(&pool).await.expect("Failed to init tables");
    pool
}
