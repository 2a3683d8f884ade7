//! Run configuration for the acquisition pipeline.
//!
//! Loaded once from YAML at startup, optionally overridden from the command
//! line, then passed by reference into every component. Nothing reads
//! configuration from globals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GenoscoutError, Result};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Lookback window in days
    #[serde(default = "default_days_lookback")]
    pub days_lookback: u32,

    /// Cap per adapter (per preprint category, per feed)
    #[serde(default = "default_max_per_source")]
    pub max_papers_per_source: usize,

    /// Cap applied after relevance filtering
    #[serde(default = "default_max_to_evaluate")]
    pub max_papers_to_evaluate: usize,

    #[serde(default = "default_true")]
    pub download_pdfs: bool,

    /// Per-call network timeout in seconds
    #[serde(default = "default_pdf_timeout")]
    pub pdf_timeout: u64,

    /// Ordered relevance keywords; the order is kept in `matched_keywords`
    #[serde(default)]
    pub genomics_keywords: Vec<String>,

    /// "biorxiv" or "medrxiv"
    #[serde(default = "default_biorxiv_server")]
    pub biorxiv_server: String,

    #[serde(default = "default_biorxiv_categories")]
    pub biorxiv_categories: Vec<String>,

    /// Journal name → feed URL, in file order
    #[serde(default, with = "journal_feeds_map")]
    pub journal_feeds: Vec<JournalFeed>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Resolver roster, tried in this order
    #[serde(default = "default_pdf_resolvers")]
    pub pdf_resolvers: Vec<ResolverKind>,

    /// Required by Unpaywall; the Unpaywall step is skipped without it
    #[serde(default)]
    pub unpaywall_email: Option<String>,

    #[serde(default)]
    pub core_api_key: Option<String>,

    #[serde(default)]
    pub courtesy: CourtesyConfig,
}

fn default_days_lookback() -> u32 { 7 }
fn default_max_per_source() -> usize { 50 }
fn default_max_to_evaluate() -> usize { 30 }
fn default_true() -> bool { true }
fn default_pdf_timeout() -> u64 { 30 }
fn default_biorxiv_server() -> String { "biorxiv".to_string() }
fn default_biorxiv_categories() -> Vec<String> { vec!["genomics".to_string()] }
fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_pdf_resolvers() -> Vec<ResolverKind> { ResolverKind::canonical_order().to_vec() }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            days_lookback: default_days_lookback(),
            max_papers_per_source: default_max_per_source(),
            max_papers_to_evaluate: default_max_to_evaluate(),
            download_pdfs: true,
            pdf_timeout: default_pdf_timeout(),
            genomics_keywords: vec![],
            biorxiv_server: default_biorxiv_server(),
            biorxiv_categories: default_biorxiv_categories(),
            journal_feeds: vec![],
            output_dir: default_output_dir(),
            pdf_resolvers: default_pdf_resolvers(),
            unpaywall_email: None,
            core_api_key: None,
            courtesy: CourtesyConfig::default(),
        }
    }
}

// ── Feeds ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalFeed {
    pub name: String,
    pub url: String,
}

/// `journal_feeds` is written as a YAML mapping but iteration order decides
/// which duplicate survives deduplication, so it is read into a `Vec`.
mod journal_feeds_map {
    use super::JournalFeed;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(feeds: &[JournalFeed], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(feeds.len()))?;
        for feed in feeds {
            map.serialize_entry(&feed.name, &feed.url)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<JournalFeed>, D::Error> {
        struct FeedsVisitor;

        impl<'de> Visitor<'de> for FeedsVisitor {
            type Value = Vec<JournalFeed>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of journal name to feed URL")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Vec::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut feeds = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, url)) = access.next_entry::<String, String>()? {
                    feeds.push(JournalFeed { name, url });
                }
                Ok(feeds)
            }
        }

        deserializer.deserialize_any(FeedsVisitor)
    }
}

// ── Resolvers ─────────────────────────────────────────────────────────────────

/// PDF resolver sources, in canonical priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// `pdf_url` supplied by the adapter
    Direct,
    /// DOI landing page and publisher-specific patterns
    LandingPage,
    SemanticScholar,
    EuropePmc,
    Core,
    Unpaywall,
}

impl ResolverKind {
    pub fn canonical_order() -> &'static [ResolverKind] {
        &[
            ResolverKind::Direct,
            ResolverKind::LandingPage,
            ResolverKind::SemanticScholar,
            ResolverKind::EuropePmc,
            ResolverKind::Core,
            ResolverKind::Unpaywall,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverKind::Direct          => "direct",
            ResolverKind::LandingPage     => "landing-page",
            ResolverKind::SemanticScholar => "semantic-scholar",
            ResolverKind::EuropePmc       => "europe-pmc",
            ResolverKind::Core            => "core",
            ResolverKind::Unpaywall       => "unpaywall",
        }
    }
}

// ── Rate courtesy ─────────────────────────────────────────────────────────────

/// Fixed delays kept between upstream calls. Not part of correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtesyConfig {
    #[serde(default = "default_between_pages")]
    pub between_pages_ms: u64,
    #[serde(default = "default_between_feeds")]
    pub between_feeds_ms: u64,
    #[serde(default = "default_between_records")]
    pub between_records_ms: u64,
}

fn default_between_pages() -> u64 { 500 }
fn default_between_feeds() -> u64 { 300 }
fn default_between_records() -> u64 { 300 }

impl Default for CourtesyConfig {
    fn default() -> Self {
        Self {
            between_pages_ms: default_between_pages(),
            between_feeds_ms: default_between_feeds(),
            between_records_ms: default_between_records(),
        }
    }
}

impl CourtesyConfig {
    /// No delays at all (tests, local mirrors).
    pub fn none() -> Self {
        Self { between_pages_ms: 0, between_feeds_ms: 0, between_records_ms: 0 }
    }

    pub fn between_pages(&self) -> Duration { Duration::from_millis(self.between_pages_ms) }
    pub fn between_feeds(&self) -> Duration { Duration::from_millis(self.between_feeds_ms) }
    pub fn between_records(&self) -> Duration { Duration::from_millis(self.between_records_ms) }
}

// ── Helper Methods ─────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GenoscoutError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
            .map_err(|e| GenoscoutError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.genomics_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(GenoscoutError::Config("genomics_keywords must not be empty".into()));
        }
        if self.max_papers_per_source == 0 {
            return Err(GenoscoutError::Config("max_papers_per_source must be positive".into()));
        }
        if self.pdf_timeout == 0 {
            return Err(GenoscoutError::Config("pdf_timeout must be positive".into()));
        }
        if !matches!(self.biorxiv_server.as_str(), "biorxiv" | "medrxiv") {
            return Err(GenoscoutError::Config(format!(
                "unknown biorxiv_server '{}' (expected biorxiv or medrxiv)",
                self.biorxiv_server
            )));
        }
        for feed in &self.journal_feeds {
            let url = url::Url::parse(&feed.url).map_err(|e| {
                GenoscoutError::Config(format!("journal feed '{}' has invalid URL: {e}", feed.name))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(GenoscoutError::Config(format!(
                    "journal feed '{}' must use http(s)",
                    feed.name
                )));
            }
        }
        Ok(())
    }

    /// Shared PDF folder, a sibling of the (usually date-stamped) output dir.
    pub fn pdf_dir(&self) -> PathBuf {
        self.output_dir
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("pdfs")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join("manifest.json")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.pdf_timeout)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
