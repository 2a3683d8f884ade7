//! PDF resolver cascade.
//!
//! Each record walks an ordered list of [`PdfSource`] steps. The first step
//! that yields verified PDF bytes wins and the bytes are written to the
//! precomputed artifact path; later steps are never invoked. Step failures
//! (errors, timeouts, rate limits, non-PDF responses) are logged and the
//! cascade moves on. Exhausting every step is a normal outcome.

pub mod core_api;
pub mod direct;
pub mod europepmc;
pub mod fetch;
pub mod landing;
pub mod semantic_scholar;
pub mod unpaywall;

use async_trait::async_trait;
use genoscout_common::sandbox::SandboxClient as Client;
use genoscout_common::{PipelineConfig, ResolverKind};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::PaperRecord;
use fetch::PdfFetcher;

/// Files at or below this size are treated as failed earlier downloads.
pub const MIN_EXISTING_BYTES: u64 = 1000;

/// What a step hands back: a URL still to be downloaded, or bytes it has
/// already fetched and accepted through [`fetch::is_acceptable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfCandidate {
    Url(String),
    Bytes(Vec<u8>),
}

/// One step of the cascade.
#[async_trait]
pub trait PdfSource: Send + Sync {
    fn kind(&self) -> ResolverKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// `Ok(None)` means this source has nothing for the record.
    async fn attempt(&self, record: &PaperRecord) -> anyhow::Result<Option<PdfCandidate>>;
}

pub struct ResolverCascade {
    steps: Vec<Box<dyn PdfSource>>,
    fetcher: PdfFetcher,
    step_timeout: Duration,
}

impl ResolverCascade {
    pub fn new(steps: Vec<Box<dyn PdfSource>>, fetcher: PdfFetcher, step_timeout: Duration) -> Self {
        Self { steps, fetcher, step_timeout }
    }

    /// Builds the configured roster, in configured order. Each step gets
    /// twice the per-call timeout: one lookup plus one download.
    pub fn from_config(config: &PipelineConfig, client: Client) -> Self {
        let fetcher = PdfFetcher::new(client.clone());
        let steps = config
            .pdf_resolvers
            .iter()
            .map(|kind| -> Box<dyn PdfSource> {
                match kind {
                    ResolverKind::Direct => Box::new(direct::DirectUrl),
                    ResolverKind::LandingPage => Box::new(landing::LandingPageResolver::new(fetcher.clone())),
                    ResolverKind::SemanticScholar => {
                        Box::new(semantic_scholar::SemanticScholarResolver::new(client.clone()))
                    }
                    ResolverKind::EuropePmc => Box::new(europepmc::EuropePmcResolver::new(client.clone())),
                    ResolverKind::Core => {
                        Box::new(core_api::CoreResolver::new(client.clone(), config.core_api_key.clone()))
                    }
                    ResolverKind::Unpaywall => Box::new(unpaywall::UnpaywallResolver::new(
                        client.clone(),
                        config.unpaywall_email.clone(),
                    )),
                }
            })
            .collect();
        Self::new(steps, fetcher, config.timeout() * 2)
    }

    pub fn roster(&self) -> Vec<ResolverKind> {
        self.steps.iter().map(|s| s.kind()).collect()
    }

    /// Resolves and writes the PDF for `record` at `dest`.
    ///
    /// Returns `dest` when a PDF is (or already was) there, `None` once
    /// every step has failed.
    pub async fn acquire(&self, record: &PaperRecord, dest: &Path) -> Option<PathBuf> {
        if has_existing_artifact(dest) {
            info!(path = %dest.display(), "Already downloaded");
            return Some(dest.to_path_buf());
        }

        for step in &self.steps {
            let Some(bytes) = self.run_step(step.as_ref(), record).await else {
                continue;
            };
            return match write_artifact(dest, &bytes) {
                Ok(()) => {
                    info!(step = step.name(), bytes = bytes.len(), path = %dest.display(), "PDF acquired");
                    Some(dest.to_path_buf())
                }
                Err(e) => {
                    warn!(path = %dest.display(), "Failed to write PDF: {e}");
                    None
                }
            };
        }

        info!(uid = record.uid(), "No PDF found, abstract only");
        None
    }

    /// The single timeout-and-catch wrapper every step runs under.
    async fn run_step(&self, step: &dyn PdfSource, record: &PaperRecord) -> Option<Vec<u8>> {
        match tokio::time::timeout(self.step_timeout, self.try_step(step, record)).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!(step = step.name(), "Resolver step failed: {e}");
                None
            }
            Err(_) => {
                warn!(step = step.name(), timeout = ?self.step_timeout, "Resolver step timed out");
                None
            }
        }
    }

    async fn try_step(&self, step: &dyn PdfSource, record: &PaperRecord) -> anyhow::Result<Option<Vec<u8>>> {
        match step.attempt(record).await? {
            None => Ok(None),
            Some(PdfCandidate::Bytes(bytes)) => Ok((!bytes.is_empty()).then_some(bytes)),
            Some(PdfCandidate::Url(url)) => {
                debug!(step = step.name(), %url, "Trying candidate");
                self.fetcher.fetch(&url).await
            }
        }
    }
}

pub fn has_existing_artifact(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > MIN_EXISTING_BYTES)
        .unwrap_or(false)
}

/// Full-file replacement: write to a temp file in the same directory, then
/// rename over the destination.
pub fn write_artifact(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = dest.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
