//! ludovec-ingest: multi-facet item embedding pipeline
//!
//! Fetches catalog items, derives per-facet descriptions (web-grounded
//! text, vision captions, or tag heuristics), fuses them into fixed-size
//! embedding vectors, and persists everything to sqlite. A similarity
//! ranker queries the resulting vectors with caller-chosen facet weights.
//!
//! The library surface is the orchestrator plus the ranker; the binary in
//! `main.rs` is a thin CLI over both.

pub mod config;
pub mod db;
pub mod extractors;
pub mod fusion;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;

pub use config::IngestConfig;
pub use services::{IngestOrchestrator, IngestTicket, SimilarityRanker};
