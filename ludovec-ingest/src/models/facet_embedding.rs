//! Facet embedding record

use crate::types::{Facet, SourceType};
use serde::{Deserialize, Serialize};

/// One embedding for one (item, facet) pair
///
/// Invariant: `vector` is unit L2 norm and has the configured target
/// dimensionality. Exactly one row exists per (item_id, facet); the fusion
/// layer upserts, so re-ingestion replaces rather than accumulates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetEmbedding {
    pub item_id: i64,
    pub facet: Facet,
    pub vector: Vec<f32>,
    pub source_type: SourceType,
    /// Opaque record of the inputs the vector was generated from
    /// (image URLs, description source, fusion weights)
    pub provenance: serde_json::Value,
    /// Identifier of the model that produced the source vectors
    pub model: String,
    /// Pipeline version stamp, for invalidating stale embeddings
    pub version: String,
}

/// Current embedding pipeline version
///
/// Bump when the extraction prompts, fusion weights, or dimensionality
/// change in a way that makes old vectors incomparable with new ones.
pub const EMBEDDING_VERSION: &str = "1";
