//! End-to-end acquisition pipeline.
//!
//! Orchestrates one run:
//!   1. Create the output and PDF directories
//!   2. Run every discovery source in order (bioRxiv/medRxiv, then each feed)
//!   3. Deduplicate across sources, first source wins
//!   4. Drop corrections, errata and other notices
//!   5. Keep keyword matches and cap the list
//!   6. Walk the PDF resolver cascade for each paper (unless disabled)
//!   7. Write the manifest
//!
//! Failures of a source or a resolver step are logged and the run goes on.
//! Only configuration errors and directory/manifest I/O end a run early.

use chrono::{DateTime, Utc};
use genoscout_common::sandbox::SandboxClient;
use genoscout_common::{GenoscoutError, PipelineConfig, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::dedup::deduplicate;
use crate::filter::{cap, exclude_non_research, truncate, RelevanceFilter};
use crate::manifest::Manifest;
use crate::models::PaperRecord;
use crate::naming::build_artifact_name;
use crate::resolver::ResolverCascade;
use crate::sources::biorxiv::BioRxivClient;
use crate::sources::feeds::FeedClient;
use crate::sources::{DiscoverySource, DiscoveryWindow};

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub duration_ms: u64,
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

pub struct Pipeline {
    config: PipelineConfig,
    sources: Vec<Box<dyn DiscoverySource>>,
    cascade: ResolverCascade,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, sources: Vec<Box<dyn DiscoverySource>>, cascade: ResolverCascade) -> Self {
        Self { config, sources, cascade }
    }

    /// Wires the production sources and resolver roster from `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let mut client = SandboxClient::with_timeout(config.timeout())?;
        for feed in &config.journal_feeds {
            client.allow_url_host(&feed.url)?;
        }

        let mut sources: Vec<Box<dyn DiscoverySource>> = vec![Box::new(BioRxivClient::new(
            client.clone(),
            &config.biorxiv_server,
            config.biorxiv_categories.clone(),
            config.courtesy.between_pages(),
        ))];
        for feed in &config.journal_feeds {
            sources.push(Box::new(FeedClient::new(client.clone(), feed.clone())));
        }

        let cascade = ResolverCascade::from_config(&config, client);
        Ok(Self::new(config, sources, cascade))
    }

    /// Runs discovery, filtering, acquisition and writes the manifest.
    /// Returns where the manifest went.
    #[instrument(skip(self), fields(output_dir = %self.config.output_dir.display()))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<PipelineOutcome> {
        let t0 = std::time::Instant::now();
        let config = &self.config;
        let pdf_dir = config.pdf_dir();
        create_dir(&config.output_dir)?;
        create_dir(&pdf_dir)?;

        info!(days = config.days_lookback, sources = self.sources.len(), "Starting paper acquisition");

        // ── 1. Discover ───────────────────────────────────────────────────────
        let window = DiscoveryWindow::new(now, config.days_lookback, config.max_papers_per_source);
        let discovered = self.discover(&window).await;
        info!(n = discovered.len(), "Total fetched");

        // ── 2. Deduplicate and exclude notices ────────────────────────────────
        let unique = deduplicate(discovered);
        let candidates = exclude_non_research(unique);
        let total_fetched = candidates.len();

        // ── 3. Relevance ──────────────────────────────────────────────────────
        let filter = RelevanceFilter::new(&config.genomics_keywords);
        let relevant = filter.apply(candidates);
        info!(before = total_fetched, after = relevant.len(), "Filtered to genomics papers");
        let mut papers = cap(relevant, config.max_papers_to_evaluate);

        // ── 4. Acquire PDFs ───────────────────────────────────────────────────
        if papers.is_empty() {
            warn!("No genomics papers found");
        } else if config.download_pdfs {
            self.acquire_all(&mut papers, &pdf_dir).await;
        } else {
            info!("Skipping PDF download");
            papers.iter_mut().for_each(PaperRecord::mark_abstract_only);
        }

        // ── 5. Manifest ───────────────────────────────────────────────────────
        let manifest = Manifest::assemble(now.date_naive(), config.days_lookback, &pdf_dir, total_fetched, papers);
        let manifest_path = config.manifest_path();
        manifest.write(&manifest_path)?;

        info!(
            papers = manifest.total_genomics,
            pdfs = manifest.total_pdfs,
            manifest = %manifest_path.display(),
            "Fetch complete"
        );

        Ok(PipelineOutcome {
            manifest_path,
            manifest,
            duration_ms: t0.elapsed().as_millis() as u64,
        })
    }

    /// Runs every source in order; a failing source contributes nothing.
    async fn discover(&self, window: &DiscoveryWindow) -> Vec<PaperRecord> {
        let mut all = Vec::new();
        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.courtesy.between_feeds()).await;
            }
            match source.discover(window).await {
                Ok(papers) => {
                    info!(source = %source.name(), n = papers.len(), "Source returned papers");
                    all.extend(papers);
                }
                Err(e) => warn!(source = %source.name(), "Source failed: {e:#}"),
            }
        }
        all
    }

    async fn acquire_all(&self, papers: &mut [PaperRecord], pdf_dir: &Path) {
        let total = papers.len();
        let mut claimed = HashSet::new();

        for (i, paper) in papers.iter_mut().enumerate() {
            info!("[{}/{}] {}", i + 1, total, truncate(&paper.title, 60));

            let dest = pdf_dir.join(format!("{}.pdf", claim_stem(&mut claimed, paper)));
            match self.cascade.acquire(paper, &dest).await {
                Some(path) => paper.mark_acquired(&path),
                None => paper.mark_abstract_only(),
            }
            tokio::time::sleep(self.config.courtesy.between_records()).await;
        }

        let acquired = papers.iter().filter(|p| p.has_pdf()).count();
        info!("Downloaded {acquired}/{total} PDFs");
    }
}

/// Two papers in one run can share a descriptive stem; the later one gets
/// its uid appended so it never reuses the earlier paper's file.
fn claim_stem(claimed: &mut HashSet<String>, paper: &PaperRecord) -> String {
    let stem = build_artifact_name(paper);
    if claimed.insert(stem.clone()) {
        return stem;
    }
    let unique = format!("{stem}-{}", paper.uid());
    claimed.insert(unique.clone());
    unique
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        GenoscoutError::Pipeline(format!("cannot create directory {}: {e}", dir.display()))
    })
}

/// Builds the production pipeline from `config` and runs it now.
pub async fn run_pipeline(config: PipelineConfig) -> Result<PipelineOutcome> {
    Pipeline::from_config(config)?.run(Utc::now()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperDraft;

    fn paper(title: &str, doi: &str) -> PaperRecord {
        PaperRecord::new(PaperDraft {
            title: title.into(),
            doi: doi.into(),
            source: "Nature Genetics".into(),
            authors: "Ada Lovelace".into(),
            date: "2026-10-14".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_claim_stem_disambiguates_collisions() {
        let mut claimed = HashSet::new();
        let a = paper("Chromatin loops in yeast", "10.1/a");
        let b = paper("Chromatin loops in yeast", "10.1/b");

        let first = claim_stem(&mut claimed, &a);
        let second = claim_stem(&mut claimed, &b);
        assert_eq!(first, build_artifact_name(&a));
        assert_eq!(second, format!("{first}-{}", b.uid()));
    }

    #[test]
    fn test_from_config_wires_sources() {
        let mut config = PipelineConfig {
            genomics_keywords: vec!["genome".into()],
            ..Default::default()
        };
        config.journal_feeds.push(genoscout_common::JournalFeed {
            name: "Genome Biology".into(),
            url: "https://genomebiology.biomedcentral.com/articles/most-recent/rss.xml".into(),
        });
        let pipeline = Pipeline::from_config(config).unwrap();
        let names: Vec<String> = pipeline.sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["bioRxiv", "Genome Biology"]);
    }

    #[test]
    fn test_uncreatable_output_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = create_dir(&blocker.join("out")).unwrap_err();
        assert!(matches!(err, GenoscoutError::Pipeline(_)));
    }
}
