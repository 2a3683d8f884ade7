//! Unpaywall: DOI → best open-access location.
//!
//! Unpaywall requires a contact email on every call; without one the step
//! does nothing.

use async_trait::async_trait;
use genoscout_common::sandbox::SandboxClient as Client;
use genoscout_common::ResolverKind;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::models::PaperRecord;
use super::{PdfCandidate, PdfSource};

const UNPAYWALL_URL: &str = "https://api.unpaywall.org/v2";

/// `best_oa_location.url_for_pdf`, else the first location offering a PDF.
pub fn best_pdf_url(body: &serde_json::Value) -> Option<String> {
    let non_empty = |v: &serde_json::Value| {
        v["url_for_pdf"]
            .as_str()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
    };
    non_empty(&body["best_oa_location"]).or_else(|| {
        body["oa_locations"]
            .as_array()
            .and_then(|locs| locs.iter().find_map(non_empty))
    })
}

pub struct UnpaywallResolver {
    client: Client,
    base: String,
    email: Option<String>,
}

impl UnpaywallResolver {
    pub fn new(client: Client, email: Option<String>) -> Self {
        Self {
            client,
            base: UNPAYWALL_URL.to_string(),
            email: email.filter(|e| !e.trim().is_empty()),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PdfSource for UnpaywallResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Unpaywall
    }

    #[instrument(skip(self, record), fields(doi = %record.doi))]
    async fn attempt(&self, record: &PaperRecord) -> anyhow::Result<Option<PdfCandidate>> {
        let Some(email) = &self.email else {
            debug!("No unpaywall_email configured, skipping");
            return Ok(None);
        };
        if record.doi.is_empty() {
            return Ok(None);
        }

        let resp = self.client
            .get(&format!("{}/{}", self.base, record.doi))?
            .query(&[("email", email.as_str())])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.error_for_status()?.json::<serde_json::Value>().await?;

        Ok(best_pdf_url(&body).map(PdfCandidate::Url))
    }
}
