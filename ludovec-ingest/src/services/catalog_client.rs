//! Storefront catalog API client
//!
//! Fetches item details, community tags, and the review summary from the
//! upstream catalog, and normalizes the loosely-typed payloads into the
//! canonical `CatalogItem` at this boundary. Malformed payloads are
//! rejected here; untyped data never travels inward.
//!
//! All catalog calls funnel through one shared rate limiter enforcing a
//! minimum inter-request spacing. Callers suspend on the limiter rather
//! than bypassing it.

use crate::models::CatalogItem;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = "ludovec/0.1.0 (+https://github.com/ludovec/ludovec)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default minimum spacing between catalog requests
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 2000;

/// Catalog fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Item does not exist upstream; fatal
    #[error("Item not found: {0}")]
    NotFound(i64),

    /// DLC, demo, soundtrack, or other secondary listing; fatal, caller
    /// should skip rather than retry
    #[error("Secondary listing, not a primary item: {0}")]
    SecondaryListing(i64),

    /// Upstream throttling; retryable
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Transport failure; retryable
    #[error("Network error: {0}")]
    Network(String),

    /// Per-call timeout; retryable
    #[error("Request timed out")]
    Timeout,

    /// Payload failed schema validation; fatal, caller may fall back to
    /// title search
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited | FetchError::Network(_) | FetchError::Timeout
        )
    }
}

/// Source of normalized catalog items
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, id: i64) -> Result<CatalogItem, FetchError>;
}

/// Rate limiter enforcing minimum spacing between requests
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the spacing
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

// ============================================================================
// Upstream payload shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct DetailsEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<DetailsPayload>,
}

#[derive(Debug, Deserialize)]
struct DetailsPayload {
    /// Listing kind: "game" for primary listings, "dlc"/"demo"/"music"
    /// for secondary ones
    #[serde(rename = "type", default)]
    kind: String,
    name: Option<String>,
    #[serde(default)]
    short_description: String,
    #[serde(default)]
    detailed_description: String,
    header_image: Option<String>,
    #[serde(default)]
    screenshots: Vec<Screenshot>,
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct Screenshot {
    path_full: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TagsEnvelope {
    #[serde(default)]
    tags: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ReviewEnvelope {
    summary: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Catalog API client
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    tags_base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl CatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        tags_base_url: impl Into<String>,
        min_interval_ms: u64,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            tags_base_url: tags_base_url.into(),
            rate_limiter: Arc::new(RateLimiter::new(min_interval_ms)),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        item_id: i64,
    ) -> Result<T, FetchError> {
        self.rate_limiter.wait().await;

        tracing::debug!(url = %url, "Querying catalog API");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        if let Some(err) = status_error(response.status(), item_id) {
            return Err(err);
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Fetch community tags; a failure here degrades to an empty tag set
    async fn fetch_tags(&self, id: i64) -> BTreeMap<String, f64> {
        let url = format!("{}/items/{}/tags", self.tags_base_url, id);
        match self.get_json::<TagsEnvelope>(&url, id).await {
            Ok(envelope) => envelope.tags,
            Err(e) => {
                tracing::warn!(item_id = id, error = %e, "Tag fetch failed, continuing without tags");
                BTreeMap::new()
            }
        }
    }

    /// Fetch the review summary; a failure degrades to no summary
    async fn fetch_review_summary(&self, id: i64) -> Option<String> {
        let url = format!("{}/items/{}/reviews", self.base_url, id);
        match self.get_json::<ReviewEnvelope>(&url, id).await {
            Ok(envelope) => envelope.summary.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                tracing::warn!(item_id = id, error = %e, "Review summary fetch failed, skipping");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch(&self, id: i64) -> Result<CatalogItem, FetchError> {
        let url = format!("{}/items/{}", self.base_url, id);
        let envelope: DetailsEnvelope = self.get_json(&url, id).await?;

        if !envelope.success {
            return Err(FetchError::NotFound(id));
        }
        let payload = envelope.data.ok_or(FetchError::NotFound(id))?;

        // Reject secondary listings on the details call alone, before
        // spending rate-limited requests on tags and reviews
        if payload.kind != "game" {
            return Err(FetchError::SecondaryListing(id));
        }

        let tags = self.fetch_tags(id).await;
        let review_summary = self.fetch_review_summary(id).await;

        let item = normalize_item(id, payload, tags, review_summary)?;

        tracing::info!(
            item_id = id,
            title = %item.title,
            images = item.images.len(),
            tags = item.tags.len(),
            "Fetched catalog item"
        );

        Ok(item)
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Map a non-success HTTP status to the fetch error it represents
fn status_error(status: reqwest::StatusCode, item_id: i64) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    Some(if status == reqwest::StatusCode::NOT_FOUND {
        FetchError::NotFound(item_id)
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        FetchError::RateLimited
    } else if status.is_server_error() {
        FetchError::Network(format!("server error {}", status.as_u16()))
    } else {
        FetchError::Malformed(format!("unexpected status {}", status.as_u16()))
    })
}

/// Normalize an upstream details payload into the canonical record
fn normalize_item(
    id: i64,
    payload: DetailsPayload,
    tags: BTreeMap<String, f64>,
    review_summary: Option<String>,
) -> Result<CatalogItem, FetchError> {
    if payload.kind != "game" {
        return Err(FetchError::SecondaryListing(id));
    }

    let title = payload
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| FetchError::Malformed(format!("item {} has no name", id)))?;

    // Cover first, then screenshots in upstream order
    let mut images = Vec::new();
    if let Some(cover) = payload.header_image.filter(|u| !u.is_empty()) {
        images.push(cover);
    }
    images.extend(
        payload
            .screenshots
            .into_iter()
            .filter_map(|s| s.path_full)
            .filter(|u| !u.is_empty()),
    );

    // Review summary rides along in the long text for narrative extraction
    let mut long_text = payload.detailed_description;
    if let Some(summary) = review_summary {
        if !long_text.is_empty() {
            long_text.push_str("\n\n");
        }
        long_text.push_str(&summary);
    }

    Ok(CatalogItem {
        id,
        title,
        short_text: payload.short_description,
        long_text,
        images,
        tags,
        genres: payload
            .genres
            .into_iter()
            .filter_map(|g| g.description)
            .collect(),
    })
}
