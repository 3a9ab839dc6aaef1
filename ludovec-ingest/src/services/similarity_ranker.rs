//! Weighted multi-facet similarity ranking
//!
//! Ranks candidates by a caller-weighted combination of per-facet cosine
//! similarities against a source item. A facet term only applies to
//! candidates that have that facet; the caller's weights are renormalized
//! over the facets present on both sides, so a candidate missing one facet
//! is scored on the facets it does share rather than penalized to zero.

use crate::db;
use crate::fusion::vector_ops::cosine_similarity;
use crate::models::FacetWeights;
use crate::types::{Facet, RankedMatch};
use anyhow::{bail, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Similarity retrieval service
pub struct SimilarityRanker {
    db: SqlitePool,
}

impl SimilarityRanker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Rank candidates against a source item.
    ///
    /// Results are sorted non-increasing by weighted score, truncated to
    /// `limit`, with scores below `threshold` dropped. Ties break by
    /// ascending candidate id. The source item never appears in its own
    /// results.
    pub async fn rank(
        &self,
        source_item_id: i64,
        weights: &FacetWeights,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<RankedMatch>> {
        let active_facets = weights.active_facets();
        if active_facets.is_empty() {
            bail!("No facet carries a positive weight");
        }

        let source_vectors = db::embeddings::load_item_vectors(&self.db, source_item_id).await?;
        if source_vectors.is_empty() {
            bail!("Item {} has no embeddings", source_item_id);
        }

        // Only facets the source actually has can contribute
        let usable_facets: Vec<Facet> = active_facets
            .into_iter()
            .filter(|f| source_vectors.contains_key(f))
            .collect();
        if usable_facets.is_empty() {
            bail!(
                "Item {} has no embeddings for any weighted facet",
                source_item_id
            );
        }

        let candidates =
            db::embeddings::load_candidate_vectors(&self.db, &usable_facets, source_item_id)
                .await?;

        let mut matches: Vec<RankedMatch> = candidates
            .into_iter()
            .filter_map(|(item_id, vectors)| {
                score_candidate(item_id, &source_vectors, &vectors, &usable_facets, weights)
            })
            .filter(|m| m.weighted >= threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.weighted
                .partial_cmp(&a.weighted)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.item_id.cmp(&b.item_id))
        });
        matches.truncate(limit);

        tracing::debug!(
            source_item_id,
            facets = usable_facets.len(),
            results = matches.len(),
            "Ranked similarity candidates"
        );

        Ok(matches)
    }
}

/// Score one candidate over the facets present on both sides
fn score_candidate(
    item_id: i64,
    source: &HashMap<Facet, Vec<f32>>,
    candidate: &HashMap<Facet, Vec<f32>>,
    facets: &[Facet],
    weights: &FacetWeights,
) -> Option<RankedMatch> {
    let mut per_facet = HashMap::new();
    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;

    for facet in facets {
        let (Some(a), Some(b)) = (source.get(facet), candidate.get(facet)) else {
            continue;
        };
        let similarity = cosine_similarity(a, b);
        per_facet.insert(*facet, similarity);
        let weight = weights.get(*facet);
        weighted_sum += weight * similarity;
        weight_total += weight;
    }

    if weight_total <= 0.0 {
        return None;
    }

    Some(RankedMatch {
        item_id,
        per_facet,
        weighted: weighted_sum / weight_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FacetEmbedding, EMBEDDING_VERSION};
    use serde_json::json;

    async fn seed(pool: &SqlitePool, item_id: i64, facet: Facet, vector: Vec<f32>) {
        db::embeddings::save_embedding(
            pool,
            &FacetEmbedding {
                item_id,
                facet,
                vector,
                source_type: facet.source_type(),
                provenance: json!({}),
                model: "stub".to_string(),
                version: EMBEDDING_VERSION.to_string(),
            },
        )
        .await
        .unwrap();
    }

    fn mechanics_only() -> FacetWeights {
        FacetWeights::from_pairs(&[(Facet::Mechanics, 1.0)])
    }

    #[tokio::test]
    async fn test_source_excluded_and_sorted_descending() {
        let pool = crate::db::test_pool().await;
        seed(&pool, 1, Facet::Mechanics, vec![1.0, 0.0]).await;
        seed(&pool, 2, Facet::Mechanics, vec![1.0, 0.1]).await;
        seed(&pool, 3, Facet::Mechanics, vec![0.0, 1.0]).await;
        seed(&pool, 4, Facet::Mechanics, vec![0.7, 0.7]).await;

        let ranker = SimilarityRanker::new(pool);
        let matches = ranker.rank(1, &mechanics_only(), 10, -1.0).await.unwrap();

        assert!(matches.iter().all(|m| m.item_id != 1));
        for pair in matches.windows(2) {
            assert!(pair[0].weighted >= pair[1].weighted);
        }
        assert_eq!(matches[0].item_id, 2);
    }

    #[tokio::test]
    async fn test_ties_break_by_ascending_id() {
        let pool = crate::db::test_pool().await;
        seed(&pool, 1, Facet::Mechanics, vec![1.0, 0.0]).await;
        // Identical vectors: identical scores
        seed(&pool, 9, Facet::Mechanics, vec![1.0, 0.0]).await;
        seed(&pool, 5, Facet::Mechanics, vec![1.0, 0.0]).await;

        let ranker = SimilarityRanker::new(pool);
        let matches = ranker.rank(1, &mechanics_only(), 10, 0.0).await.unwrap();

        let ids: Vec<i64> = matches.iter().map(|m| m.item_id).collect();
        assert_eq!(ids, vec![5, 9]);
    }

    #[tokio::test]
    async fn test_limit_and_threshold() {
        let pool = crate::db::test_pool().await;
        seed(&pool, 1, Facet::Mechanics, vec![1.0, 0.0]).await;
        seed(&pool, 2, Facet::Mechanics, vec![1.0, 0.0]).await;
        seed(&pool, 3, Facet::Mechanics, vec![0.9, 0.1]).await;
        seed(&pool, 4, Facet::Mechanics, vec![0.0, 1.0]).await;

        let ranker = SimilarityRanker::new(pool);

        // Orthogonal candidate falls under the threshold
        let matches = ranker.rank(1, &mechanics_only(), 10, 0.5).await.unwrap();
        assert_eq!(matches.len(), 2);

        let matches = ranker.rank(1, &mechanics_only(), 1, 0.5).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].item_id, 2);
    }

    #[tokio::test]
    async fn test_weights_renormalized_over_shared_facets() {
        let pool = crate::db::test_pool().await;
        seed(&pool, 1, Facet::Mechanics, vec![1.0, 0.0]).await;
        seed(&pool, 1, Facet::Narrative, vec![1.0, 0.0]).await;
        // Candidate 2 shares both facets, candidate 3 only mechanics
        seed(&pool, 2, Facet::Mechanics, vec![1.0, 0.0]).await;
        seed(&pool, 2, Facet::Narrative, vec![1.0, 0.0]).await;
        seed(&pool, 3, Facet::Mechanics, vec![1.0, 0.0]).await;

        let weights =
            FacetWeights::from_pairs(&[(Facet::Mechanics, 1.0), (Facet::Narrative, 1.0)]);
        let ranker = SimilarityRanker::new(pool);
        let matches = ranker.rank(1, &weights, 10, 0.0).await.unwrap();

        // Both candidates score 1.0: candidate 3's single shared facet
        // carries the full renormalized weight
        assert_eq!(matches.len(), 2);
        for m in &matches {
            assert!((m.weighted - 1.0).abs() < 1e-5);
        }
        assert_eq!(matches[1].item_id, 3);
        assert_eq!(matches[1].per_facet.len(), 1);
    }

    #[tokio::test]
    async fn test_source_without_embeddings_is_an_error() {
        let pool = crate::db::test_pool().await;
        let ranker = SimilarityRanker::new(pool);
        assert!(ranker.rank(42, &mechanics_only(), 10, 0.0).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_weights_rejected() {
        let pool = crate::db::test_pool().await;
        seed(&pool, 1, Facet::Mechanics, vec![1.0]).await;
        let ranker = SimilarityRanker::new(pool);
        assert!(ranker.rank(1, &FacetWeights::new(), 10, 0.0).await.is_err());
    }
}
