//! Web-grounded facet descriptions
//!
//! Asks a search-grounded generation model how the item's community
//! describes a given facet, then runs a second refinement pass that keeps
//! only descriptor noun/adjective phrases. Narrative filler and verbs
//! dilute embedding signal, so the refined form is what gets embedded.
//!
//! Responses matching the unhelpful-phrase denylist are discarded so the
//! extractor can fall through to vision captioning or tag heuristics.

use crate::models::CatalogItem;
use crate::types::{Facet, GroundedGenerator, InferenceError};
use crate::utils::{retry_with_backoff, RetryPolicy};
use std::sync::Arc;

/// Phrases that mark a search response as unusable. Matched
/// case-insensitively anywhere in the response.
const UNHELPFUL_PHRASES: &[&str] = &[
    "i cannot",
    "i can't",
    "i could not",
    "i couldn't",
    "i don't have",
    "i do not have",
    "no information available",
    "no information found",
    "unable to find",
    "not able to find",
    "i'm sorry",
    "as an ai",
];

/// Detect a search response that carries no usable description.
///
/// Denylist matching is a deliberate tradeoff: the search provider gives
/// no structured signal for "nothing found", so phrase matching is the
/// maintainable option.
pub fn is_unhelpful_response(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    UNHELPFUL_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Search-grounded description extractor
pub struct WebDescriber {
    generator: Arc<dyn GroundedGenerator>,
    retry: RetryPolicy,
}

impl WebDescriber {
    pub fn new(generator: Arc<dyn GroundedGenerator>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    /// Produce a refined community description for one facet.
    ///
    /// Returns `Ok(None)` when the search came back unhelpful; the caller
    /// falls through to the next strategy.
    pub async fn describe(
        &self,
        item: &CatalogItem,
        facet: Facet,
    ) -> Result<Option<String>, InferenceError> {
        let search_prompt = search_prompt(item, facet);
        let raw = self.generate_with_retry(&search_prompt).await?;

        if is_unhelpful_response(&raw) {
            tracing::debug!(
                item_id = item.id,
                facet = %facet,
                "Search response unhelpful, discarding"
            );
            return Ok(None);
        }

        // Refinement pass: strip narrative filler down to descriptor phrases
        let refined = self
            .generate_with_retry(&refinement_prompt(&raw))
            .await
            .unwrap_or_default();

        if is_unhelpful_response(&refined) {
            // Keep the raw description rather than losing the signal
            tracing::debug!(
                item_id = item.id,
                facet = %facet,
                "Refinement pass unusable, keeping raw description"
            );
            return Ok(Some(raw));
        }

        Ok(Some(refined))
    }

    async fn generate_with_retry(&self, prompt: &str) -> Result<String, InferenceError> {
        retry_with_backoff(
            "web search",
            self.retry,
            |e: &InferenceError| e.is_retryable(),
            || self.generator.generate(prompt),
        )
        .await
    }
}

/// Facet aspect phrase used in prompts
fn facet_aspect(facet: Facet) -> &'static str {
    match facet {
        Facet::Aesthetic => "visual style and art direction",
        Facet::Atmosphere => "mood and atmosphere",
        Facet::Mechanics => "gameplay mechanics and systems",
        Facet::Narrative => "story, setting, and themes",
        Facet::Dynamics => "pacing and moment-to-moment feel",
    }
}

fn search_prompt(item: &CatalogItem, facet: Facet) -> String {
    format!(
        "Search for how players and reviewers describe the {aspect} of the game \
         \"{title}\". Summarize the community consensus in 2-3 sentences. If you \
         find nothing about this game, say \"no information found\".",
        aspect = facet_aspect(facet),
        title = item.title,
    )
}

fn refinement_prompt(raw: &str) -> String {
    format!(
        "Rewrite the following game description as a comma-separated list of \
         descriptor noun and adjective phrases only. Drop verbs, full sentences, \
         and narrative filler. Keep every concrete descriptor.\n\n{raw}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn test_item() -> CatalogItem {
        CatalogItem {
            id: 620,
            title: "Hollow Depths".to_string(),
            short_text: String::new(),
            long_text: String::new(),
            images: vec![],
            tags: BTreeMap::new(),
            genres: vec![],
        }
    }

    /// Generator returning canned responses in order
    struct ScriptedGenerator {
        responses: Mutex<Vec<Result<String, InferenceError>>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, InferenceError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait::async_trait]
    impl GroundedGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err(InferenceError::EmptyResponse)
            } else {
                responses.remove(0)
            }
        }
    }

    fn describer(responses: Vec<Result<String, InferenceError>>) -> WebDescriber {
        WebDescriber::new(
            Arc::new(ScriptedGenerator::new(responses)),
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
        )
    }

    #[test]
    fn test_unhelpful_denylist() {
        assert!(is_unhelpful_response(""));
        assert!(is_unhelpful_response("   "));
        assert!(is_unhelpful_response("I cannot find details about this game."));
        assert!(is_unhelpful_response("No information available for this title."));
        assert!(is_unhelpful_response("I'm sorry, I was unable to find reviews."));
        assert!(!is_unhelpful_response(
            "Players describe a bleak, oppressive world with tight combat."
        ));
    }

    #[tokio::test]
    async fn test_refined_description_preferred() {
        let describer = describer(vec![
            Ok("Players describe the game as dark and punishing.".to_string()),
            Ok("dark fantasy, punishing combat, bleak".to_string()),
        ]);

        let result = describer
            .describe(&test_item(), Facet::Atmosphere)
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("dark fantasy, punishing combat, bleak"));
    }

    #[tokio::test]
    async fn test_unhelpful_search_yields_none() {
        let describer = describer(vec![Ok("no information found".to_string())]);
        let result = describer
            .describe(&test_item(), Facet::Mechanics)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_failed_refinement_keeps_raw() {
        let describer = describer(vec![
            Ok("Tight metroidvania exploration with brutal bosses.".to_string()),
            Err(InferenceError::EmptyResponse),
        ]);

        let result = describer
            .describe(&test_item(), Facet::Mechanics)
            .await
            .unwrap();
        assert_eq!(
            result.as_deref(),
            Some("Tight metroidvania exploration with brutal bosses.")
        );
    }

    #[tokio::test]
    async fn test_search_error_propagates() {
        let describer = describer(vec![Err(InferenceError::Server(500, "down".into()))]);
        let err = describer
            .describe(&test_item(), Facet::Narrative)
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Server(500, _)));
    }
}
