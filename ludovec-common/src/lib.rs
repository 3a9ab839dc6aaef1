//! # Ludovec Common Library
//!
//! Shared code for the ludovec services:
//! - Common error types (Error enum)
//! - Configuration loading (TOML file + environment overrides)

pub mod config;
pub mod error;

pub use error::{Error, Result};
