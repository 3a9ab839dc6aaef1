//! Canonical catalog item record
//!
//! The one normalized shape the rest of the pipeline depends on. Produced
//! exclusively at the catalog ingress boundary; upstream field-shape
//! inconsistencies never travel past `CatalogClient`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized catalog item
///
/// Identity is the stable external numeric key. The record is immutable
/// between refreshes; a refresh replaces the whole row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable external numeric key
    pub id: i64,
    /// Display title
    pub title: String,
    /// Short marketing blurb
    pub short_text: String,
    /// Long-form description, plus the community review summary when present
    pub long_text: String,
    /// Ordered image URLs; the first entry is the cover
    pub images: Vec<String>,
    /// Community tag name → vote weight
    pub tags: BTreeMap<String, f64>,
    /// Genre names
    pub genres: Vec<String>,
}

impl CatalogItem {
    /// Cover image URL, if the item has any images at all
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(|s| s.as_str())
    }

    /// Screenshot URLs (everything after the cover)
    pub fn screenshots(&self) -> &[String] {
        if self.images.is_empty() {
            &[]
        } else {
            &self.images[1..]
        }
    }

    /// Tag names ordered by descending vote weight
    pub fn tags_by_weight(&self) -> Vec<&str> {
        let mut tags: Vec<(&str, f64)> = self
            .tags
            .iter()
            .map(|(name, weight)| (name.as_str(), *weight))
            .collect();
        tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        tags.into_iter().map(|(name, _)| name).collect()
    }
}
