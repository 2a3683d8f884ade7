//! bioRxiv / medRxiv preprint client.
//!
//! Uses the bioRxiv details API:
//!   https://api.biorxiv.org/details/{server}/{start}/{end}/{cursor}/json
//!
//! The API has no category parameter, so every configured category pages
//! through the whole interval and keeps the items whose category matches.

use async_trait::async_trait;
use genoscout_common::sandbox::SandboxClient as Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::dedup::deduplicate;
use crate::models::{PaperDraft, PaperRecord};
use super::{DiscoverySource, DiscoveryWindow};

const DETAILS_URL: &str = "https://api.biorxiv.org/details";
/// Items per page returned by the details API; a shorter page is the last one.
pub const PAGE_SIZE: usize = 30;

#[derive(Debug, Deserialize)]
struct DetailsPage {
    #[serde(default)]
    collection: Vec<DetailsItem>,
}

#[derive(Debug, Deserialize)]
struct DetailsItem {
    #[serde(default)]
    doi: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: String,
    #[serde(default, rename = "abstract")]
    abstract_text: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    category: String,
    /// Sent as a string by the API, tolerated as a number.
    #[serde(default)]
    version: serde_json::Value,
}

pub struct BioRxivClient {
    client: Client,
    /// "biorxiv" or "medrxiv"
    server: String,
    base: String,
    categories: Vec<String>,
    page_delay: Duration,
}

impl BioRxivClient {
    pub fn new(client: Client, server: &str, categories: Vec<String>, page_delay: Duration) -> Self {
        Self {
            client,
            server: server.to_string(),
            base: DETAILS_URL.to_string(),
            categories,
            page_delay,
        }
    }

    /// Point the client at a different API root (mirrors, tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base = url.trim_end_matches('/').to_string();
        self
    }

    fn display_name(&self) -> &'static str {
        if self.server == "medrxiv" { "medRxiv" } else { "bioRxiv" }
    }

    async fn fetch_page(&self, window: &DiscoveryWindow, cursor: usize) -> anyhow::Result<DetailsPage> {
        let url = format!(
            "{}/{}/{}/{}/{}/json",
            self.base,
            self.server,
            window.start_date(),
            window.end_date(),
            cursor
        );
        let page = self.client
            .get(&url)?
            .send()
            .await?
            .error_for_status()?
            .json::<DetailsPage>()
            .await?;
        Ok(page)
    }

    /// Pages through the interval for one category until the cap is reached
    /// or the server signals the last page. A failing page ends the category
    /// but keeps what was already collected.
    #[instrument(skip(self, window))]
    async fn fetch_category(&self, category: &str, window: &DiscoveryWindow) -> Vec<PaperRecord> {
        let limit = window.max_per_source;
        let wanted = category.to_lowercase();
        let mut cursor = 0;
        let mut papers = Vec::new();

        while papers.len() < limit {
            let page = match self.fetch_page(window, cursor).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(server = %self.server, cursor, "{} API error: {e}", self.display_name());
                    break;
                }
            };

            let n = page.collection.len();
            if n == 0 {
                break;
            }

            papers.extend(
                page.collection
                    .into_iter()
                    .filter(|item| item.category.to_lowercase().contains(&wanted))
                    .filter_map(|item| self.item_to_record(item)),
            );

            cursor += n;
            if n < PAGE_SIZE {
                break;
            }
            debug!(cursor, collected = papers.len(), "Fetching next page");
            tokio::time::sleep(self.page_delay).await;
        }

        papers.truncate(limit);
        info!(category, n = papers.len(), "papers found");
        papers
    }

    fn item_to_record(&self, item: DetailsItem) -> Option<PaperRecord> {
        let title = item.title.trim();
        if title.is_empty() || item.abstract_text.trim().is_empty() {
            return None;
        }

        let doi = item.doi.trim().to_string();
        let version = match &item.version {
            serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => "1".to_string(),
        };
        let (url, pdf_url) = if doi.is_empty() {
            (String::new(), String::new())
        } else {
            (
                format!("https://doi.org/{doi}"),
                format!("https://www.{}.org/content/{doi}v{version}.full.pdf", self.server),
            )
        };

        Some(PaperRecord::new(PaperDraft {
            title: title.to_string(),
            authors: item.authors,
            abstract_text: item.abstract_text,
            source: format!("{} ({})", self.display_name(), item.category.to_lowercase()),
            url,
            doi,
            date: item.date,
            pdf_url,
        }))
    }
}

#[async_trait]
impl DiscoverySource for BioRxivClient {
    fn name(&self) -> String {
        self.display_name().to_string()
    }

    async fn discover(&self, window: &DiscoveryWindow) -> anyhow::Result<Vec<PaperRecord>> {
        let mut papers = Vec::new();
        for category in &self.categories {
            info!(server = %self.server, category = %category, "Preprint category");
            papers.extend(self.fetch_category(category, window).await);
        }
        // Categories overlap (e.g. "genomics" inside "cancer genomics")
        Ok(deduplicate(papers))
    }
}
