//! Domain models for ludovec-ingest

mod catalog_item;
mod facet_embedding;
mod facet_weights;
mod ingest_job;

pub use catalog_item::CatalogItem;
pub use facet_embedding::{FacetEmbedding, EMBEDDING_VERSION};
pub use facet_weights::FacetWeights;
pub use ingest_job::{IngestJob, JobStatus};
