//! CORE v3 work search. Returns the hosted `downloadUrl` of the top hit.

use async_trait::async_trait;
use genoscout_common::sandbox::SandboxClient as Client;
use genoscout_common::ResolverKind;
use reqwest::StatusCode;
use tracing::{instrument, warn};

use crate::models::PaperRecord;
use super::{PdfCandidate, PdfSource};

const CORE_SEARCH_URL: &str = "https://api.core.ac.uk/v3/search/works";

pub struct CoreResolver {
    client: Client,
    search_url: String,
    api_key: Option<String>,
}

impl CoreResolver {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            search_url: CORE_SEARCH_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.search_url = url.to_string();
        self
    }
}

#[async_trait]
impl PdfSource for CoreResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Core
    }

    #[instrument(skip(self, record), fields(doi = %record.doi))]
    async fn attempt(&self, record: &PaperRecord) -> anyhow::Result<Option<PdfCandidate>> {
        let query = if record.doi.is_empty() { &record.title } else { &record.doi };
        if query.is_empty() {
            return Ok(None);
        }

        let mut request = self.client
            .get(&self.search_url)?
            .query(&[("q", query.as_str()), ("limit", "1")]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("CORE rate limit hit");
            return Ok(None);
        }
        let body = resp.error_for_status()?.json::<serde_json::Value>().await?;

        Ok(body["results"]
            .as_array()
            .and_then(|hits| hits.first())
            .and_then(|hit| hit["downloadUrl"].as_str())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| PdfCandidate::Url(u.to_string())))
    }
}
