//! genoscout-ingestion — Genomics paper discovery and PDF acquisition.
//! - Discovery (bioRxiv / medRxiv details API, journal RSS / Atom feeds)
//! - Deduplication across sources
//! - Notice exclusion and keyword relevance filtering
//! - PDF resolver cascade (direct, landing page, Semantic Scholar,
//!   Europe PMC, CORE, Unpaywall)
//! - Descriptive artifact naming
//! - Run manifest

pub mod dedup;
pub mod filter;
pub mod manifest;
pub mod models;
pub mod naming;
pub mod pipeline;
pub mod resolver;
pub mod sources;

pub use manifest::Manifest;
pub use models::{PaperDraft, PaperRecord, ReviewMode};
pub use pipeline::{run_pipeline, Pipeline, PipelineOutcome};
