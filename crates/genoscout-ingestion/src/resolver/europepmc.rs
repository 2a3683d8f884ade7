//! Europe PMC: DOI → PMCID via the REST search API, then the PDF render
//! service for that accession.
//!
//! Search endpoint: https://www.ebi.ac.uk/europepmc/webservices/rest/search

use async_trait::async_trait;
use genoscout_common::sandbox::SandboxClient as Client;
use genoscout_common::ResolverKind;
use tracing::{debug, instrument};

use crate::models::PaperRecord;
use super::{PdfCandidate, PdfSource};

const EPMC_SEARCH_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";
const EPMC_RENDER_URL: &str = "https://europepmc.org/backend/ptpmcrender.fcgi";

/// Render-service URL serving the PDF of a PMC accession.
pub fn render_url(pmcid: &str) -> String {
    format!("{EPMC_RENDER_URL}?accid={pmcid}&blobtype=pdf")
}

pub struct EuropePmcResolver {
    client: Client,
    search_url: String,
}

impl EuropePmcResolver {
    pub fn new(client: Client) -> Self {
        Self { client, search_url: EPMC_SEARCH_URL.to_string() }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.search_url = url.to_string();
        self
    }

    /// First PMCID among the search hits for this DOI.
    pub async fn pmcid_for_doi(&self, doi: &str) -> anyhow::Result<Option<String>> {
        let query = format!("DOI:{doi}");
        let params = [
            ("query", query.as_str()),
            ("format", "json"),
            ("resultType", "core"),
        ];

        let resp = self.client
            .get(&self.search_url)?
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let results = resp["resultList"]["result"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        debug!(count = results.len(), "Europe PMC search returned results");

        Ok(results
            .iter()
            .filter_map(|r| r["pmcid"].as_str())
            .map(str::trim)
            .find(|id| !id.is_empty())
            .map(String::from))
    }
}

#[async_trait]
impl PdfSource for EuropePmcResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::EuropePmc
    }

    #[instrument(skip(self, record), fields(doi = %record.doi))]
    async fn attempt(&self, record: &PaperRecord) -> anyhow::Result<Option<PdfCandidate>> {
        if record.doi.is_empty() {
            return Ok(None);
        }
        Ok(self
            .pmcid_for_doi(&record.doi)
            .await?
            .map(|pmcid| PdfCandidate::Url(render_url(&pmcid))))
    }
}
