//! genoscout-common — Shared errors, configuration and the capped HTTP client
//! used across all Genoscout crates.

pub mod error;
pub mod pipeline_config;
pub mod sandbox;

// Re-export commonly used types
pub use error::{GenoscoutError, Result};
pub use pipeline_config::{CourtesyConfig, JournalFeed, PipelineConfig, ResolverKind};
