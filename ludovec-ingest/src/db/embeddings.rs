//! Facet embedding persistence
//!
//! One row per (item_id, facet), enforced by the primary key and an
//! upsert. Last write wins, which makes concurrent re-ingestion of the
//! same item safe without cross-item locking.

use crate::models::FacetEmbedding;
use crate::types::Facet;
use anyhow::{anyhow, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Upsert one facet embedding
pub async fn save_embedding(pool: &SqlitePool, embedding: &FacetEmbedding) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO item_embeddings (item_id, facet, vector, source_type, provenance, model, version, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(item_id, facet) DO UPDATE SET
            vector = excluded.vector,
            source_type = excluded.source_type,
            provenance = excluded.provenance,
            model = excluded.model,
            version = excluded.version,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(embedding.item_id)
    .bind(embedding.facet.as_str())
    .bind(serde_json::to_string(&embedding.vector)?)
    .bind(embedding.source_type.as_str())
    .bind(embedding.provenance.to_string())
    .bind(&embedding.model)
    .bind(&embedding.version)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all facet vectors for one item
pub async fn load_item_vectors(
    pool: &SqlitePool,
    item_id: i64,
) -> Result<HashMap<Facet, Vec<f32>>> {
    let rows = sqlx::query("SELECT facet, vector FROM item_embeddings WHERE item_id = ?")
        .bind(item_id)
        .fetch_all(pool)
        .await?;

    let mut vectors = HashMap::new();
    for row in rows {
        let facet_str: String = row.get("facet");
        let facet = Facet::parse(&facet_str)
            .ok_or_else(|| anyhow!("Unknown facet in item_embeddings: {}", facet_str))?;
        let vector_json: String = row.get("vector");
        vectors.insert(facet, serde_json::from_str(&vector_json)?);
    }
    Ok(vectors)
}

/// Load every candidate's vectors for the given facets, excluding one item.
///
/// Returns item_id → (facet → vector), only for facets in `facets`.
pub async fn load_candidate_vectors(
    pool: &SqlitePool,
    facets: &[Facet],
    exclude_item_id: i64,
) -> Result<HashMap<i64, HashMap<Facet, Vec<f32>>>> {
    let mut candidates: HashMap<i64, HashMap<Facet, Vec<f32>>> = HashMap::new();
    if facets.is_empty() {
        return Ok(candidates);
    }

    let placeholders = vec!["?"; facets.len()].join(", ");
    let sql = format!(
        "SELECT item_id, facet, vector FROM item_embeddings
         WHERE item_id != ? AND facet IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql).bind(exclude_item_id);
    for facet in facets {
        query = query.bind(facet.as_str());
    }

    for row in query.fetch_all(pool).await? {
        let item_id: i64 = row.get("item_id");
        let facet_str: String = row.get("facet");
        let facet = Facet::parse(&facet_str)
            .ok_or_else(|| anyhow!("Unknown facet in item_embeddings: {}", facet_str))?;
        let vector_json: String = row.get("vector");
        candidates
            .entry(item_id)
            .or_default()
            .insert(facet, serde_json::from_str(&vector_json)?);
    }

    Ok(candidates)
}

/// Count embedding rows for one item
pub async fn count_embeddings(pool: &SqlitePool, item_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM item_embeddings WHERE item_id = ?")
        .bind(item_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}
