//! Facet description extraction
//!
//! Derives one natural-language description per text-bearing facet from
//! three independently combinable strategies, in priority order:
//! 1. web-grounded community search (refined to descriptor phrases),
//! 2. vision captioning over the sampled screenshots,
//! 3. deterministic tag bucketing.
//!
//! The chosen description is used alone. Concatenating strategies was
//! tried and dilutes embedding signal, so the first non-empty result wins.
//!
//! A failure extracting one facet never affects the others: each facet is
//! caught individually, logged, and left as an empty placeholder.

mod tag_mapper;
mod vision_describer;
mod web_describer;

pub use tag_mapper::TagMapper;
pub use vision_describer::VisionDescriber;
pub use web_describer::{is_unhelpful_response, WebDescriber};

use crate::models::CatalogItem;
use crate::types::{Facet, FacetDescriptions, GroundedGenerator, VisionCaptioner};
use crate::utils::RetryPolicy;
use std::sync::Arc;

/// Upper bound on images sent to inference per item
pub const MAX_SAMPLED_IMAGES: usize = 4;

/// Pick a bounded, diversity-sampled image subset: first, early-mid,
/// late-mid, and last. The first entry (the cover) is always kept.
pub fn select_representative_images(images: &[String]) -> Vec<String> {
    if images.len() <= MAX_SAMPLED_IMAGES {
        return images.to_vec();
    }

    let last = images.len() - 1;
    let mut indices = vec![0, last / 3, last * 2 / 3, last];
    indices.dedup();

    indices.into_iter().map(|i| images[i].clone()).collect()
}

/// Per-facet description extractor
pub struct FacetExtractor {
    web: WebDescriber,
    vision: VisionDescriber,
    tags: TagMapper,
}

impl FacetExtractor {
    pub fn new(
        generator: Arc<dyn GroundedGenerator>,
        captioner: Arc<dyn VisionCaptioner>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            web: WebDescriber::new(generator, retry),
            vision: VisionDescriber::new(captioner, retry),
            tags: TagMapper::new(),
        }
    }

    /// Derive descriptions for every text-bearing facet, in parallel.
    ///
    /// `images` is the already-sampled subset. The aesthetic facet is
    /// image-sourced and gets no description here.
    pub async fn describe_facets(
        &self,
        item: &CatalogItem,
        images: &[String],
    ) -> FacetDescriptions {
        let text_facets: Vec<Facet> = Facet::ALL
            .into_iter()
            .filter(|f| f.uses_text())
            .collect();

        let results = futures::future::join_all(
            text_facets
                .iter()
                .map(|facet| self.describe_one(item, *facet, images)),
        )
        .await;

        let mut descriptions = FacetDescriptions::new();
        for (facet, description) in text_facets.into_iter().zip(results) {
            descriptions.insert(facet, description);
        }
        descriptions
    }

    /// One facet, with failure isolation: any error degrades to the next
    /// strategy, and a total miss yields an empty placeholder.
    async fn describe_one(&self, item: &CatalogItem, facet: Facet, images: &[String]) -> String {
        match self.web.describe(item, facet).await {
            Ok(Some(description)) => {
                tracing::debug!(item_id = item.id, facet = %facet, "Using web-grounded description");
                return description;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    item_id = item.id,
                    facet = %facet,
                    error = %e,
                    "Web-grounded extraction failed, falling back"
                );
            }
        }

        match self.vision.describe(item, facet, images).await {
            Ok(Some(description)) => {
                tracing::debug!(item_id = item.id, facet = %facet, "Using vision-captioned description");
                return description;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    item_id = item.id,
                    facet = %facet,
                    error = %e,
                    "Vision captioning failed, falling back to tags"
                );
            }
        }

        match self.tags.describe_facet(item, facet) {
            Some(description) => {
                tracing::debug!(item_id = item.id, facet = %facet, "Using tag-derived description");
                description
            }
            None => {
                tracing::warn!(
                    item_id = item.id,
                    facet = %facet,
                    "No description could be extracted for facet"
                );
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InferenceError;
    use std::collections::BTreeMap;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_small_sets_kept_whole() {
        let images = urls(&["a", "b", "c"]);
        assert_eq!(select_representative_images(&images), images);
    }

    #[test]
    fn test_large_sets_sampled_first_spread_last() {
        let images: Vec<String> = (0..10).map(|i| format!("img{i}")).collect();
        let sampled = select_representative_images(&images);
        assert_eq!(sampled, urls(&["img0", "img3", "img6", "img9"]));
    }

    #[test]
    fn test_sampling_is_bounded() {
        let images: Vec<String> = (0..100).map(|i| format!("img{i}")).collect();
        assert_eq!(select_representative_images(&images).len(), MAX_SAMPLED_IMAGES);
    }

    // Strategy priority and isolation tests use a generator that fails for
    // one facet's prompts and a captioner that always fails, leaving tag
    // fallback as the bottom rung.

    struct FacetSensitiveGenerator;

    #[async_trait::async_trait]
    impl GroundedGenerator for FacetSensitiveGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
            if prompt.contains("mood and atmosphere") {
                // Simulated provider outage for exactly one facet
                Err(InferenceError::Server(500, "boom".into()))
            } else if prompt.contains("Rewrite") {
                Ok("refined descriptors".to_string())
            } else {
                Ok("community description".to_string())
            }
        }
    }

    struct FailingCaptioner;

    #[async_trait::async_trait]
    impl VisionCaptioner for FailingCaptioner {
        async fn caption(&self, _url: &str, _prompt: &str) -> Result<String, InferenceError> {
            Err(InferenceError::EmptyResponse)
        }
    }

    fn test_item() -> CatalogItem {
        let mut tags = BTreeMap::new();
        tags.insert("Atmospheric".to_string(), 100.0);
        tags.insert("Roguelike".to_string(), 80.0);
        CatalogItem {
            id: 620,
            title: "Hollow Depths".to_string(),
            short_text: String::new(),
            long_text: String::new(),
            images: vec!["cover.jpg".to_string()],
            tags,
            genres: vec![],
        }
    }

    fn extractor() -> FacetExtractor {
        FacetExtractor::new(
            Arc::new(FacetSensitiveGenerator),
            Arc::new(FailingCaptioner),
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
        )
    }

    #[tokio::test]
    async fn test_one_facet_failing_does_not_sink_the_others() {
        let item = test_item();
        let images = urls(&["cover.jpg"]);
        let descriptions = extractor().describe_facets(&item, &images).await;

        // Atmosphere fell through web (outage) and vision (failing) to tags
        assert_eq!(descriptions.get(Facet::Atmosphere), Some("atmospheric"));
        // The other facets got the refined web description
        assert_eq!(descriptions.get(Facet::Mechanics), Some("refined descriptors"));
        assert_eq!(descriptions.get(Facet::Narrative), Some("refined descriptors"));
        assert_eq!(descriptions.get(Facet::Dynamics), Some("refined descriptors"));
    }

    #[tokio::test]
    async fn test_total_miss_yields_empty_placeholder() {
        struct AlwaysUnhelpful;

        #[async_trait::async_trait]
        impl GroundedGenerator for AlwaysUnhelpful {
            async fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
                Ok("no information found".to_string())
            }
        }

        let extractor = FacetExtractor::new(
            Arc::new(AlwaysUnhelpful),
            Arc::new(FailingCaptioner),
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
        );

        let mut item = test_item();
        item.tags.clear();
        let descriptions = extractor.describe_facets(&item, &[]).await;

        // Entries exist for every text facet but all are placeholders
        assert_eq!(descriptions.len(), 4);
        for facet in [Facet::Atmosphere, Facet::Mechanics, Facet::Narrative, Facet::Dynamics] {
            assert!(descriptions.get(facet).is_none());
        }
    }
}
