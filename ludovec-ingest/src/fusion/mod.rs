//! Embedding fusion layer
//!
//! Converts images and text into vectors via the injected embedding
//! providers, fuses multiple vectors per facet by weighted average, fits
//! them to the target dimensionality, and L2-normalizes.

mod facet_embedder;
pub mod vector_ops;

pub use facet_embedder::{EmbedError, FacetEmbedder};
