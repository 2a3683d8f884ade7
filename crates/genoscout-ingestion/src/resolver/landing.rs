//! DOI-based full-text resolver with its own fallback chain.
//!
//! 1. `https://doi.org/{doi}` landing page → `<meta name="citation_pdf_url">`
//! 2. eLife DOIs → `https://elifesciences.org/articles/{N}.pdf`
//! 3. arXiv DOIs → `https://arxiv.org/pdf/{id}`
//!
//! The first candidate that passes the PDF check wins. The cascade sees a
//! single step that either hands back verified bytes or nothing.

use async_trait::async_trait;
use genoscout_common::ResolverKind;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, instrument};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::models::PaperRecord;
use super::fetch::{is_acceptable, PdfFetcher};
use super::{PdfCandidate, PdfSource};

const DOI_RESOLVER_URL: &str = "https://doi.org";

fn elife_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^10\.7554/elife\.(\d+)").unwrap())
}

fn arxiv_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^10\.48550/arxiv\.(.+)$").unwrap())
}

/// Publisher-pattern URLs derivable from the DOI alone.
pub fn pattern_pdf_urls(doi: &str) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(c) = elife_regex().captures(doi) {
        urls.push(format!("https://elifesciences.org/articles/{}.pdf", &c[1]));
    }
    if let Some(c) = arxiv_regex().captures(doi) {
        urls.push(format!("https://arxiv.org/pdf/{}", &c[1]));
    }
    urls
}

/// `citation_pdf_url` from a landing page, resolved against the page URL.
pub fn citation_pdf_url(html: &str, page_url: &Url) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[name="citation_pdf_url"]"#).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .and_then(|c| page_url.join(c).ok())
        .map(|u| u.to_string())
}

pub struct LandingPageResolver {
    fetcher: PdfFetcher,
    doi_base: String,
}

impl LandingPageResolver {
    pub fn new(fetcher: PdfFetcher) -> Self {
        Self { fetcher, doi_base: DOI_RESOLVER_URL.to_string() }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.doi_base = url.trim_end_matches('/').to_string();
        self
    }

    /// Follows the DOI redirect. Publishers occasionally serve the PDF
    /// straight from the landing URL; otherwise the meta tag is read.
    async fn landing_page(&self, doi: &str) -> anyhow::Result<LandingOutcome> {
        let url = format!("{}/{}", self.doi_base, doi);
        let resp = self.fetcher.client().download(&url)?.send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("landing page returned {}", resp.status());
        }
        let status = resp.status();
        let final_url = resp.url().clone();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;
        if is_acceptable(status, content_type.as_deref(), &body) {
            return Ok(LandingOutcome::Pdf(body.to_vec()));
        }
        let html = String::from_utf8_lossy(&body);
        Ok(match citation_pdf_url(&html, &final_url) {
            Some(u) => LandingOutcome::PdfUrl(u),
            None => LandingOutcome::Nothing,
        })
    }
}

enum LandingOutcome {
    Pdf(Vec<u8>),
    PdfUrl(String),
    Nothing,
}

#[async_trait]
impl PdfSource for LandingPageResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::LandingPage
    }

    #[instrument(skip(self, record), fields(doi = %record.doi))]
    async fn attempt(&self, record: &PaperRecord) -> anyhow::Result<Option<PdfCandidate>> {
        if record.doi.is_empty() {
            return Ok(None);
        }

        let mut candidates = Vec::new();
        match self.landing_page(&record.doi).await {
            Ok(LandingOutcome::Pdf(bytes)) => return Ok(Some(PdfCandidate::Bytes(bytes))),
            Ok(LandingOutcome::PdfUrl(u)) => candidates.push(u),
            Ok(LandingOutcome::Nothing) => debug!("No citation_pdf_url on landing page"),
            Err(e) => debug!("Landing page unavailable: {e}"),
        }
        candidates.extend(pattern_pdf_urls(&record.doi));

        for url in candidates {
            match self.fetcher.fetch(&url).await {
                Ok(Some(bytes)) => return Ok(Some(PdfCandidate::Bytes(bytes))),
                Ok(None) => debug!(%url, "Candidate was not a PDF"),
                Err(e) => debug!(%url, "Candidate fetch failed: {e}"),
            }
        }
        Ok(None)
    }
}
