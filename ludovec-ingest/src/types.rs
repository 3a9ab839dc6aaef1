//! Core types and trait definitions for ludovec-ingest
//!
//! Defines the facet vocabulary, the inference client traits the pipeline
//! depends on, and the error taxonomy for external inference calls.
//!
//! All inference providers sit behind `async_trait` seams so the concrete
//! reqwest clients can be swapped for mocks in tests. Clients are
//! constructed once at process start and injected into the components that
//! use them; there is no lazily-initialized shared state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// Facets
// ============================================================================

/// One independent semantic similarity dimension
///
/// Each facet gets its own embedding row per item. Facets are embedded from
/// different sources: screenshots for aesthetic, text descriptions for
/// mechanics/narrative/dynamics, and a blend of both for atmosphere (tone is
/// primarily conveyed visually).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    /// Visual style and art direction
    Aesthetic,
    /// Mood and tone
    Atmosphere,
    /// Gameplay mechanics and systems
    Mechanics,
    /// Story, setting, and theme
    Narrative,
    /// Pacing and moment-to-moment feel
    Dynamics,
}

impl Facet {
    /// All facets, in canonical order
    pub const ALL: [Facet; 5] = [
        Facet::Aesthetic,
        Facet::Atmosphere,
        Facet::Mechanics,
        Facet::Narrative,
        Facet::Dynamics,
    ];

    /// How this facet's embedding is sourced
    pub fn source_type(&self) -> SourceType {
        match self {
            Facet::Aesthetic => SourceType::Image,
            Facet::Atmosphere => SourceType::Multimodal,
            Facet::Mechanics | Facet::Narrative | Facet::Dynamics => SourceType::Text,
        }
    }

    /// Whether this facet consumes a text description
    pub fn uses_text(&self) -> bool {
        !matches!(self.source_type(), SourceType::Image)
    }

    /// Stable string key used in the database and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Aesthetic => "aesthetic",
            Facet::Atmosphere => "atmosphere",
            Facet::Mechanics => "mechanics",
            Facet::Narrative => "narrative",
            Facet::Dynamics => "dynamics",
        }
    }

    /// Parse a database/CLI facet key
    pub fn parse(s: &str) -> Option<Facet> {
        match s {
            "aesthetic" => Some(Facet::Aesthetic),
            "atmosphere" => Some(Facet::Atmosphere),
            "mechanics" => Some(Facet::Mechanics),
            "narrative" => Some(Facet::Narrative),
            "dynamics" => Some(Facet::Dynamics),
            _ => None,
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modality an embedding was generated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Image,
    Text,
    Multimodal,
    Video,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Image => "image",
            SourceType::Text => "text",
            SourceType::Multimodal => "multimodal",
            SourceType::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<SourceType> {
        match s {
            "image" => Some(SourceType::Image),
            "text" => Some(SourceType::Text),
            "multimodal" => Some(SourceType::Multimodal),
            "video" => Some(SourceType::Video),
            _ => None,
        }
    }
}

// ============================================================================
// Facet descriptions
// ============================================================================

/// Per-facet natural-language descriptions produced by the extractor layer
///
/// A facet that failed extraction carries an empty string rather than being
/// absent, so downstream code can distinguish "not a text facet" from
/// "extraction degraded".
#[derive(Debug, Clone, Default)]
pub struct FacetDescriptions {
    descriptions: HashMap<Facet, String>,
}

impl FacetDescriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, facet: Facet, description: String) {
        self.descriptions.insert(facet, description);
    }

    /// Description for a facet; empty placeholder counts as absent
    pub fn get(&self, facet: Facet) -> Option<&str> {
        self.descriptions
            .get(&facet)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

// ============================================================================
// Inference errors
// ============================================================================

/// Errors from external inference services (captioning, embedding, search)
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Server error {0}: {1}")]
    Server(u16, String),

    #[error("Request timed out")]
    Timeout,

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(String),
}

impl InferenceError {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::RateLimited | InferenceError::Timeout | InferenceError::Network(_) => {
                true
            }
            InferenceError::Server(status, _) => *status >= 500,
            InferenceError::EmptyResponse => false,
        }
    }
}

// ============================================================================
// Inference client traits
// ============================================================================

/// Image-to-text captioning model
#[async_trait::async_trait]
pub trait VisionCaptioner: Send + Sync {
    /// Describe an image under a facet-specific instruction
    async fn caption(&self, image_url: &str, prompt: &str) -> Result<String, InferenceError>;
}

/// Image embedding model
#[async_trait::async_trait]
pub trait ImageEmbedder: Send + Sync {
    /// Embed an image into the model's native vector space
    async fn embed_image(&self, image_url: &str) -> Result<Vec<f32>, InferenceError>;

    /// Model identifier recorded in embedding provenance
    fn model_name(&self) -> &str;
}

/// Text embedding model
#[async_trait::async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed text, optionally requesting a native target dimensionality
    ///
    /// Providers that support a native dimension parameter should honor
    /// `target_dim`; others may ignore it, in which case the fusion layer
    /// fits the vector by zero-padding or truncation.
    async fn embed_text(
        &self,
        text: &str,
        target_dim: Option<usize>,
    ) -> Result<Vec<f32>, InferenceError>;

    /// Model identifier recorded in embedding provenance
    fn model_name(&self) -> &str;
}

/// Search-grounded text generation model
///
/// Used both to look up how an item is described by its community and to
/// refine those descriptions into dense descriptor phrases.
#[async_trait::async_trait]
pub trait GroundedGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
}

// ============================================================================
// Ranking
// ============================================================================

/// One ranked similarity match
#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    pub item_id: i64,
    /// Cosine similarity per facet that was present on both sides
    pub per_facet: HashMap<Facet, f32>,
    /// Weighted combination of the per-facet similarities
    pub weighted: f32,
}
