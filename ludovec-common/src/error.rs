//! Common error types for ludovec

use thiserror::Error;

/// Common result type for ludovec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the ludovec workspace.
///
/// Service crates keep their own per-client error enums and use `anyhow`
/// at the orchestration layer; this enum carries only the concerns that
/// genuinely live in the shared crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
