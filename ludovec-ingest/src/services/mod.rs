//! Service layer: external clients and pipeline orchestration

pub mod catalog_client;
pub mod inference_client;
pub mod ingest_orchestrator;
pub mod similarity_ranker;

pub use catalog_client::{CatalogClient, CatalogSource, FetchError};
pub use inference_client::{InferenceGateway, ModelIds};
pub use ingest_orchestrator::{IngestOrchestrator, IngestTicket};
pub use similarity_ranker::SimilarityRanker;
