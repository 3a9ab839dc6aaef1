//! Facet weight presets for similarity queries
//!
//! Weights are non-negative and normalized at query time, so presets can be
//! written in whatever scale reads best.

use crate::types::Facet;
use std::collections::HashMap;

/// Facet → non-negative weight mapping for a rank query
#[derive(Debug, Clone, Default)]
pub struct FacetWeights {
    weights: HashMap<Facet, f32>,
}

impl FacetWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit (facet, weight) pairs; negative weights are clamped to zero
    pub fn from_pairs(pairs: &[(Facet, f32)]) -> Self {
        let mut weights = HashMap::new();
        for (facet, weight) in pairs {
            weights.insert(*facet, weight.max(0.0));
        }
        Self { weights }
    }

    /// Weight for a facet (0.0 when unset)
    pub fn get(&self, facet: Facet) -> f32 {
        self.weights.get(&facet).copied().unwrap_or(0.0)
    }

    /// Facets carrying a strictly positive weight
    pub fn active_facets(&self) -> Vec<Facet> {
        Facet::ALL
            .into_iter()
            .filter(|f| self.get(*f) > 0.0)
            .collect()
    }

    /// Sum of all weights
    pub fn total(&self) -> f32 {
        self.weights.values().sum()
    }

    /// Named preset lookup
    pub fn preset(name: &str) -> Option<Self> {
        let pairs: &[(Facet, f32)] = match name {
            // Even pull across every facet
            "balanced" => &[
                (Facet::Aesthetic, 1.0),
                (Facet::Atmosphere, 1.0),
                (Facet::Mechanics, 1.0),
                (Facet::Narrative, 1.0),
                (Facet::Dynamics, 1.0),
            ],
            // Visual kinship first
            "looks" => &[
                (Facet::Aesthetic, 3.0),
                (Facet::Atmosphere, 1.5),
                (Facet::Mechanics, 0.5),
            ],
            // Mood and tone
            "feels" => &[
                (Facet::Atmosphere, 3.0),
                (Facet::Aesthetic, 1.5),
                (Facet::Narrative, 1.0),
            ],
            // Similar gameplay regardless of skin
            "plays" => &[
                (Facet::Mechanics, 3.0),
                (Facet::Dynamics, 2.0),
                (Facet::Aesthetic, 0.5),
            ],
            // Story-driven matches
            "story" => &[
                (Facet::Narrative, 3.0),
                (Facet::Atmosphere, 1.5),
                (Facet::Mechanics, 0.5),
            ],
            _ => return None,
        };
        Some(Self::from_pairs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_weights_clamped() {
        let weights = FacetWeights::from_pairs(&[(Facet::Aesthetic, -2.0), (Facet::Mechanics, 1.0)]);
        assert_eq!(weights.get(Facet::Aesthetic), 0.0);
        assert_eq!(weights.get(Facet::Mechanics), 1.0);
        assert_eq!(weights.active_facets(), vec![Facet::Mechanics]);
    }

    #[test]
    fn test_unset_facet_is_zero() {
        let weights = FacetWeights::from_pairs(&[(Facet::Narrative, 2.0)]);
        assert_eq!(weights.get(Facet::Dynamics), 0.0);
    }

    #[test]
    fn test_presets_exist() {
        for name in ["balanced", "looks", "feels", "plays", "story"] {
            let preset = FacetWeights::preset(name).expect(name);
            assert!(preset.total() > 0.0, "preset {} has no weight", name);
        }
        assert!(FacetWeights::preset("vibes").is_none());
    }

    #[test]
    fn test_balanced_preset_covers_all_facets() {
        let preset = FacetWeights::preset("balanced").unwrap();
        assert_eq!(preset.active_facets().len(), Facet::ALL.len());
    }
}
