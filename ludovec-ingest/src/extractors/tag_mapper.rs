//! Tag-derived facet descriptions
//!
//! Deterministically buckets community tags into facet-relevant groups via
//! a fixed synonym/category table. Used as the fallback (or supplement)
//! when neither web search nor vision captioning produced anything for a
//! facet, and as the primary mechanics signal for items with rich tag data.

use crate::models::CatalogItem;
use crate::types::Facet;

/// Most tags kept per facet description
const MAX_TAGS_PER_FACET: usize = 8;

/// Fixed tag → facet category table
///
/// Matching is case-insensitive on the normalized tag name. Tags outside
/// the table contribute to no facet.
const TAG_BUCKETS: &[(Facet, &[&str])] = &[
    (
        Facet::Aesthetic,
        &[
            "pixel graphics", "hand-drawn", "anime", "realistic", "voxel", "minimalist",
            "cartoony", "retro", "stylized", "cel shaded", "2d", "3d", "isometric",
            "beautiful", "colorful",
        ],
    ),
    (
        Facet::Atmosphere,
        &[
            "atmospheric", "dark", "horror", "psychological horror", "cozy", "relaxing",
            "wholesome", "creepy", "tense", "dreamlike", "lovecraftian", "bleak", "surreal",
            "funny", "emotional", "immersive",
        ],
    ),
    (
        Facet::Mechanics,
        &[
            "roguelike", "roguelite", "deckbuilding", "card game", "turn-based",
            "turn-based strategy", "real time tactics", "crafting", "open world",
            "metroidvania", "platformer", "puzzle", "strategy", "rpg", "shooter", "fps",
            "survival", "simulation", "city builder", "stealth", "sandbox", "tower defense",
            "4x", "base building", "resource management", "exploration",
        ],
    ),
    (
        Facet::Narrative,
        &[
            "story rich", "choices matter", "multiple endings", "fantasy", "sci-fi",
            "cyberpunk", "post-apocalyptic", "mystery", "historical", "drama",
            "visual novel", "mythology", "lore-rich", "dystopian", "detective",
        ],
    ),
    (
        Facet::Dynamics,
        &[
            "fast-paced", "difficult", "casual", "bullet hell", "precision platformer",
            "permadeath", "grindy", "replay value", "short", "relaxed", "action",
            "twitchy", "methodical", "time pressure",
        ],
    ),
];

/// Deterministic tag-to-facet mapper
#[derive(Debug, Clone, Default)]
pub struct TagMapper;

impl TagMapper {
    pub fn new() -> Self {
        Self
    }

    /// Facet a tag belongs to, if any
    pub fn bucket_for(&self, tag: &str) -> Option<Facet> {
        let normalized = tag.trim().to_lowercase();
        for (facet, tags) in TAG_BUCKETS {
            if tags.contains(&normalized.as_str()) {
                return Some(*facet);
            }
        }
        None
    }

    /// Compose a facet description from the item's tags, highest-voted
    /// first. Genres supplement the mechanics facet. Returns `None` when no
    /// tag maps to the facet.
    pub fn describe_facet(&self, item: &CatalogItem, facet: Facet) -> Option<String> {
        let mut picked: Vec<String> = item
            .tags_by_weight()
            .into_iter()
            .filter(|tag| self.bucket_for(tag) == Some(facet))
            .take(MAX_TAGS_PER_FACET)
            .map(|tag| tag.to_lowercase())
            .collect();

        if facet == Facet::Mechanics {
            for genre in &item.genres {
                let genre = genre.to_lowercase();
                if picked.len() >= MAX_TAGS_PER_FACET {
                    break;
                }
                if !picked.contains(&genre) {
                    picked.push(genre);
                }
            }
        }

        if picked.is_empty() {
            None
        } else {
            Some(picked.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn item_with_tags(tags: &[(&str, f64)], genres: &[&str]) -> CatalogItem {
        CatalogItem {
            id: 620,
            title: "Test Game".to_string(),
            short_text: String::new(),
            long_text: String::new(),
            images: vec![],
            tags: tags
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect::<BTreeMap<_, _>>(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn test_bucket_lookup_is_case_insensitive() {
        let mapper = TagMapper::new();
        assert_eq!(mapper.bucket_for("Roguelike"), Some(Facet::Mechanics));
        assert_eq!(mapper.bucket_for("PIXEL GRAPHICS"), Some(Facet::Aesthetic));
        assert_eq!(mapper.bucket_for("Atmospheric"), Some(Facet::Atmosphere));
        assert_eq!(mapper.bucket_for("Esports"), None);
    }

    #[test]
    fn test_describe_facet_orders_by_weight() {
        let mapper = TagMapper::new();
        let item = item_with_tags(
            &[("Roguelike", 50.0), ("Deckbuilding", 200.0), ("Story Rich", 90.0)],
            &[],
        );

        let mechanics = mapper.describe_facet(&item, Facet::Mechanics).unwrap();
        assert_eq!(mechanics, "deckbuilding, roguelike");

        let narrative = mapper.describe_facet(&item, Facet::Narrative).unwrap();
        assert_eq!(narrative, "story rich");
    }

    #[test]
    fn test_genres_supplement_mechanics() {
        let mapper = TagMapper::new();
        let item = item_with_tags(&[("Roguelike", 10.0)], &["Strategy"]);
        let mechanics = mapper.describe_facet(&item, Facet::Mechanics).unwrap();
        assert_eq!(mechanics, "roguelike, strategy");
    }

    #[test]
    fn test_unmapped_tags_yield_none() {
        let mapper = TagMapper::new();
        let item = item_with_tags(&[("Esports", 10.0)], &[]);
        assert!(mapper.describe_facet(&item, Facet::Dynamics).is_none());
    }

    #[test]
    fn test_identical_tags_give_identical_descriptions() {
        let mapper = TagMapper::new();
        let tags = [("Roguelike", 120.0), ("Difficult", 80.0), ("Fast-Paced", 60.0)];
        let a = item_with_tags(&tags, &[]);
        let mut b = item_with_tags(&tags, &[]);
        b.id = 621;

        for facet in [Facet::Mechanics, Facet::Dynamics] {
            assert_eq!(
                mapper.describe_facet(&a, facet),
                mapper.describe_facet(&b, facet)
            );
        }
    }
}
