//! Vision-captioned facet descriptions
//!
//! Sends the diversity-sampled image subset to an image-to-text model with
//! a facet-specific instruction and joins the captions into one
//! description. Individual caption failures are dropped; the describer
//! yields `None` only when every image failed or none were given.

use crate::models::CatalogItem;
use crate::types::{Facet, InferenceError, VisionCaptioner};
use crate::utils::{retry_with_backoff, RetryPolicy};
use std::sync::Arc;

/// Caption-based description extractor
pub struct VisionDescriber {
    captioner: Arc<dyn VisionCaptioner>,
    retry: RetryPolicy,
}

impl VisionDescriber {
    pub fn new(captioner: Arc<dyn VisionCaptioner>, retry: RetryPolicy) -> Self {
        Self { captioner, retry }
    }

    /// Caption the sampled images under a facet instruction.
    pub async fn describe(
        &self,
        item: &CatalogItem,
        facet: Facet,
        images: &[String],
    ) -> Result<Option<String>, InferenceError> {
        if images.is_empty() {
            return Ok(None);
        }

        let prompt = caption_prompt(facet);
        let mut captions = Vec::new();
        let mut last_error = None;

        for url in images {
            match self.caption_with_retry(url, &prompt).await {
                Ok(caption) => {
                    let caption = caption.trim().to_string();
                    if !caption.is_empty() {
                        captions.push(caption);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        item_id = item.id,
                        facet = %facet,
                        image = %url,
                        error = %e,
                        "Dropping failed caption"
                    );
                    last_error = Some(e);
                }
            }
        }

        if captions.is_empty() {
            return match last_error {
                Some(e) => Err(e),
                None => Ok(None),
            };
        }

        Ok(Some(captions.join("; ")))
    }

    async fn caption_with_retry(
        &self,
        url: &str,
        prompt: &str,
    ) -> Result<String, InferenceError> {
        retry_with_backoff(
            "vision caption",
            self.retry,
            |e: &InferenceError| e.is_retryable(),
            || self.captioner.caption(url, prompt),
        )
        .await
    }
}

fn caption_prompt(facet: Facet) -> String {
    let focus = match facet {
        Facet::Aesthetic => "the art style, color palette, and visual technique",
        Facet::Atmosphere => "the mood, tone, and emotional atmosphere",
        Facet::Mechanics => "the visible gameplay systems, UI, and player actions",
        Facet::Narrative => "the setting, characters, and story elements visible",
        Facet::Dynamics => "the pacing and intensity the scene suggests",
    };
    format!(
        "This is a screenshot from a video game. Describe {focus} in one dense \
         sentence of concrete descriptors."
    )
}
