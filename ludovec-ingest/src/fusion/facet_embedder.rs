//! Per-facet embedding generation
//!
//! Turns a facet's inputs (sampled images, composed description, or both)
//! into one unit-norm `FacetEmbedding`:
//! - **Image facets** embed each sampled image independently, weighting the
//!   cover at 2x, and fuse by weighted mean. Failed image embeddings are
//!   dropped and the weights renormalized over the survivors.
//! - **Text facets** embed the composed description, asking the provider
//!   for the target dimensionality natively where supported.
//! - **Multimodal facets** fuse one cover-image vector and one text vector
//!   with fixed weights favoring the visual component.
//!
//! An error is raised only when zero vectors could be produced for the
//! facet; anything less degrades gracefully.

use crate::fusion::vector_ops::{fit_dimension, l2_normalize, weighted_mean};
use crate::models::{FacetEmbedding, EMBEDDING_VERSION};
use crate::types::{Facet, ImageEmbedder, InferenceError, SourceType, TextEmbedder};
use crate::utils::{retry_with_backoff, RetryPolicy};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Cover image weight relative to secondary screenshots
const COVER_WEIGHT: f32 = 2.0;
const SCREENSHOT_WEIGHT: f32 = 1.0;

/// Multimodal fusion weights; tone reads mostly from the visuals
const MULTIMODAL_IMAGE_WEIGHT: f32 = 0.6;
const MULTIMODAL_TEXT_WEIGHT: f32 = 0.4;

/// Longest description excerpt kept in provenance
const PROVENANCE_TEXT_LIMIT: usize = 240;

/// Facet embedding errors
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The facet had no images or text to work from at all
    #[error("No usable inputs for facet {0}")]
    NoInputs(Facet),

    /// Inputs existed but every embedding attempt failed
    #[error("All embedding sources failed for facet {facet}: {last_error}")]
    Exhausted { facet: Facet, last_error: String },
}

/// Per-facet embedding generator
pub struct FacetEmbedder {
    image_embedder: Arc<dyn ImageEmbedder>,
    text_embedder: Arc<dyn TextEmbedder>,
    target_dim: usize,
    retry: RetryPolicy,
}

impl FacetEmbedder {
    pub fn new(
        image_embedder: Arc<dyn ImageEmbedder>,
        text_embedder: Arc<dyn TextEmbedder>,
        target_dim: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            image_embedder,
            text_embedder,
            target_dim,
            retry,
        }
    }

    /// Generate the embedding for one facet of one item.
    ///
    /// `images` is the already-sampled subset, cover first. `description`
    /// is the extractor's chosen text for the facet, if any.
    pub async fn embed_facet(
        &self,
        item_id: i64,
        facet: Facet,
        description: Option<&str>,
        images: &[String],
    ) -> Result<FacetEmbedding, EmbedError> {
        match facet.source_type() {
            SourceType::Image => self.embed_image_facet(item_id, facet, images).await,
            SourceType::Text => self.embed_text_facet(item_id, facet, description).await,
            SourceType::Multimodal => {
                self.embed_multimodal_facet(item_id, facet, description, images)
                    .await
            }
            SourceType::Video => Err(EmbedError::NoInputs(facet)),
        }
    }

    async fn embed_image_facet(
        &self,
        item_id: i64,
        facet: Facet,
        images: &[String],
    ) -> Result<FacetEmbedding, EmbedError> {
        if images.is_empty() {
            return Err(EmbedError::NoInputs(facet));
        }

        let mut vectors = Vec::new();
        let mut weights = Vec::new();
        let mut used_images = Vec::new();
        let mut last_error = String::new();

        for (index, url) in images.iter().enumerate() {
            // Cover image (position 0) counts double
            let weight = if index == 0 { COVER_WEIGHT } else { SCREENSHOT_WEIGHT };

            match self.embed_image_with_retry(url).await {
                Ok(vector) => {
                    vectors.push(vector);
                    weights.push(weight);
                    used_images.push(url.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        item_id,
                        facet = %facet,
                        image = %url,
                        error = %e,
                        "Dropping failed image embedding"
                    );
                    last_error = e.to_string();
                }
            }
        }

        let fused = weighted_mean(&vectors, &weights)
            .ok_or(EmbedError::Exhausted { facet, last_error })?;

        let provenance = json!({
            "images": used_images,
            "weights": weights,
        });

        Ok(self.finish(item_id, facet, fused, provenance, self.image_embedder.model_name()))
    }

    async fn embed_text_facet(
        &self,
        item_id: i64,
        facet: Facet,
        description: Option<&str>,
    ) -> Result<FacetEmbedding, EmbedError> {
        let text = description
            .filter(|t| !t.trim().is_empty())
            .ok_or(EmbedError::NoInputs(facet))?;

        let vector = self
            .embed_text_with_retry(text)
            .await
            .map_err(|e| EmbedError::Exhausted {
                facet,
                last_error: e.to_string(),
            })?;

        let provenance = json!({
            "description": excerpt(text),
        });

        Ok(self.finish(item_id, facet, vector, provenance, self.text_embedder.model_name()))
    }

    async fn embed_multimodal_facet(
        &self,
        item_id: i64,
        facet: Facet,
        description: Option<&str>,
        images: &[String],
    ) -> Result<FacetEmbedding, EmbedError> {
        let cover = images.first();
        let text = description.filter(|t| !t.trim().is_empty());

        if cover.is_none() && text.is_none() {
            return Err(EmbedError::NoInputs(facet));
        }

        let mut vectors = Vec::new();
        let mut weights = Vec::new();
        let mut sources = Vec::new();
        let mut last_error = String::new();

        if let Some(url) = cover {
            match self.embed_image_with_retry(url).await {
                Ok(vector) => {
                    // Image side is in native space; fit before mixing with text
                    vectors.push(fit_dimension(vector, self.target_dim));
                    weights.push(MULTIMODAL_IMAGE_WEIGHT);
                    sources.push(json!({ "image": url }));
                }
                Err(e) => {
                    tracing::warn!(
                        item_id,
                        facet = %facet,
                        image = %url,
                        error = %e,
                        "Multimodal image side failed, falling back to text alone"
                    );
                    last_error = e.to_string();
                }
            }
        }

        if let Some(text) = text {
            match self.embed_text_with_retry(text).await {
                Ok(vector) => {
                    vectors.push(fit_dimension(vector, self.target_dim));
                    weights.push(MULTIMODAL_TEXT_WEIGHT);
                    sources.push(json!({ "description": excerpt(text) }));
                }
                Err(e) => {
                    tracing::warn!(
                        item_id,
                        facet = %facet,
                        error = %e,
                        "Multimodal text side failed, falling back to image alone"
                    );
                    last_error = e.to_string();
                }
            }
        }

        let fused = weighted_mean(&vectors, &weights)
            .ok_or(EmbedError::Exhausted { facet, last_error })?;

        let provenance = json!({
            "sources": sources,
            "weights": weights,
        });

        let model = format!(
            "{}+{}",
            self.image_embedder.model_name(),
            self.text_embedder.model_name()
        );
        Ok(self.finish(item_id, facet, fused, provenance, &model))
    }

    async fn embed_image_with_retry(&self, url: &str) -> Result<Vec<f32>, InferenceError> {
        retry_with_backoff(
            "image embed",
            self.retry,
            |e: &InferenceError| e.is_retryable(),
            || self.image_embedder.embed_image(url),
        )
        .await
    }

    async fn embed_text_with_retry(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        retry_with_backoff(
            "text embed",
            self.retry,
            |e: &InferenceError| e.is_retryable(),
            || self.text_embedder.embed_text(text, Some(self.target_dim)),
        )
        .await
    }

    fn finish(
        &self,
        item_id: i64,
        facet: Facet,
        vector: Vec<f32>,
        provenance: serde_json::Value,
        model: &str,
    ) -> FacetEmbedding {
        let mut vector = fit_dimension(vector, self.target_dim);
        l2_normalize(&mut vector);

        FacetEmbedding {
            item_id,
            facet,
            vector,
            source_type: facet.source_type(),
            provenance,
            model: model.to_string(),
            version: EMBEDDING_VERSION.to_string(),
        }
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(PROVENANCE_TEXT_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::vector_ops::l2_norm;
    use crate::types::InferenceError;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const DIM: usize = 8;

    /// Deterministic embedder: the vector depends only on the input string.
    /// URLs listed in `failing` error with a rate limit.
    struct StubEmbedder {
        failing: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubEmbedder {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn vector_for(input: &str) -> Vec<f32> {
            let mut v = vec![0.0f32; DIM];
            for (i, b) in input.bytes().enumerate() {
                v[i % DIM] += b as f32;
            }
            v
        }

        fn respond(&self, input: &str) -> Result<Vec<f32>, InferenceError> {
            self.calls.lock().unwrap().push(input.to_string());
            if self.failing.contains(input) {
                // Non-retryable so tests stay fast
                Err(InferenceError::EmptyResponse)
            } else {
                Ok(Self::vector_for(input))
            }
        }
    }

    #[async_trait::async_trait]
    impl ImageEmbedder for StubEmbedder {
        async fn embed_image(&self, image_url: &str) -> Result<Vec<f32>, InferenceError> {
            self.respond(image_url)
        }

        fn model_name(&self) -> &str {
            "stub-image"
        }
    }

    #[async_trait::async_trait]
    impl TextEmbedder for StubEmbedder {
        async fn embed_text(
            &self,
            text: &str,
            _target_dim: Option<usize>,
        ) -> Result<Vec<f32>, InferenceError> {
            self.respond(text)
        }

        fn model_name(&self) -> &str {
            "stub-text"
        }
    }

    fn embedder(failing: &[&str]) -> FacetEmbedder {
        let stub = Arc::new(StubEmbedder::new(failing));
        FacetEmbedder::new(stub.clone(), stub, DIM, RetryPolicy::default())
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_image_facet_produces_unit_vector() {
        let embedding = embedder(&[])
            .embed_facet(620, Facet::Aesthetic, None, &urls(&["cover.jpg", "s1.jpg"]))
            .await
            .unwrap();

        assert_eq!(embedding.vector.len(), DIM);
        assert!((l2_norm(&embedding.vector) - 1.0).abs() < 1e-5);
        assert_eq!(embedding.source_type, SourceType::Image);
        assert_eq!(embedding.model, "stub-image");
        assert_eq!(embedding.version, EMBEDDING_VERSION);
    }

    #[tokio::test]
    async fn test_cover_only_embeds_at_full_weight() {
        // A cover with no screenshots still embeds; the single survivor
        // carries the whole renormalized weight, so the fused vector is the
        // cover vector itself (normalized).
        let embedding = embedder(&[])
            .embed_facet(620, Facet::Aesthetic, None, &urls(&["cover.jpg"]))
            .await
            .unwrap();

        let mut expected = fit_dimension(StubEmbedder::vector_for("cover.jpg"), DIM);
        l2_normalize(&mut expected);
        for (a, b) in embedding.vector.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_failed_image_dropped_and_weights_renormalized() {
        let embedding = embedder(&["s1.jpg"])
            .embed_facet(
                620,
                Facet::Aesthetic,
                None,
                &urls(&["cover.jpg", "s1.jpg", "s2.jpg"]),
            )
            .await
            .unwrap();

        assert!((l2_norm(&embedding.vector) - 1.0).abs() < 1e-5);
        // Provenance records only the surviving images
        let used: Vec<String> = embedding.provenance["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(used, vec!["cover.jpg", "s2.jpg"]);
    }

    #[tokio::test]
    async fn test_all_images_failing_is_an_error() {
        let err = embedder(&["cover.jpg", "s1.jpg"])
            .embed_facet(620, Facet::Aesthetic, None, &urls(&["cover.jpg", "s1.jpg"]))
            .await
            .unwrap_err();

        assert!(matches!(err, EmbedError::Exhausted { facet: Facet::Aesthetic, .. }));
    }

    #[tokio::test]
    async fn test_no_images_is_no_inputs() {
        let err = embedder(&[])
            .embed_facet(620, Facet::Aesthetic, None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbedError::NoInputs(Facet::Aesthetic)));
    }

    #[tokio::test]
    async fn test_text_facet_embeds_description() {
        let embedding = embedder(&[])
            .embed_facet(620, Facet::Mechanics, Some("deck building, roguelike"), &[])
            .await
            .unwrap();

        assert!((l2_norm(&embedding.vector) - 1.0).abs() < 1e-5);
        assert_eq!(embedding.source_type, SourceType::Text);
        assert_eq!(
            embedding.provenance["description"].as_str(),
            Some("deck building, roguelike")
        );
    }

    #[tokio::test]
    async fn test_text_facet_without_description_is_no_inputs() {
        let err = embedder(&[])
            .embed_facet(620, Facet::Narrative, Some("   "), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbedError::NoInputs(Facet::Narrative)));
    }

    #[tokio::test]
    async fn test_multimodal_fuses_both_sides() {
        let embedding = embedder(&[])
            .embed_facet(
                620,
                Facet::Atmosphere,
                Some("oppressive, dark"),
                &urls(&["cover.jpg"]),
            )
            .await
            .unwrap();

        assert!((l2_norm(&embedding.vector) - 1.0).abs() < 1e-5);
        assert_eq!(embedding.source_type, SourceType::Multimodal);
        assert_eq!(embedding.model, "stub-image+stub-text");
        assert_eq!(embedding.provenance["sources"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_multimodal_degrades_to_single_side() {
        // Image side fails: the text vector carries full weight
        let embedding = embedder(&["cover.jpg"])
            .embed_facet(
                620,
                Facet::Atmosphere,
                Some("oppressive, dark"),
                &urls(&["cover.jpg"]),
            )
            .await
            .unwrap();

        let mut expected = fit_dimension(StubEmbedder::vector_for("oppressive, dark"), DIM);
        l2_normalize(&mut expected);
        for (a, b) in embedding.vector.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_multimodal_with_nothing_is_no_inputs() {
        let err = embedder(&[])
            .embed_facet(620, Facet::Atmosphere, None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbedError::NoInputs(Facet::Atmosphere)));
    }
}
