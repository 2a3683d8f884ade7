//! Semantic Scholar graph API: `openAccessPdf.url` by DOI, or by title search
//! when the record has no DOI.

use async_trait::async_trait;
use genoscout_common::sandbox::SandboxClient as Client;
use genoscout_common::ResolverKind;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::OnceLock;
use tracing::{debug, instrument, warn};

use crate::models::PaperRecord;
use super::europepmc::render_url;
use super::{PdfCandidate, PdfSource};

const S2_GRAPH_URL: &str = "https://api.semanticscholar.org/graph/v1";

fn pmcid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(PMC\d+)").unwrap())
}

/// Post-processes an open-access URL.
///
/// PMC mirrors refuse scripted downloads, so PMC article links are sent to
/// the Europe PMC render service instead. bioRxiv blocks them outright and
/// is dropped; the direct step already tried the preprint URL.
pub fn rewrite_oa_url(url: &str) -> Option<String> {
    let lower = url.to_lowercase();
    if lower.contains("ncbi.nlm.nih.gov") || lower.contains("europepmc.org") {
        if let Some(c) = pmcid_regex().captures(url) {
            return Some(render_url(&c[1]));
        }
    }
    if lower.contains("biorxiv.org") {
        return None;
    }
    Some(url.to_string())
}

pub struct SemanticScholarResolver {
    client: Client,
    base: String,
}

impl SemanticScholarResolver {
    pub fn new(client: Client) -> Self {
        Self { client, base: S2_GRAPH_URL.to_string() }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base = url.trim_end_matches('/').to_string();
        self
    }

    async fn lookup(&self, record: &PaperRecord) -> anyhow::Result<Option<serde_json::Value>> {
        let request = if record.doi.is_empty() {
            self.client
                .get(&format!("{}/paper/search", self.base))?
                .query(&[
                    ("query", record.title.as_str()),
                    ("limit", "1"),
                    ("fields", "openAccessPdf"),
                ])
        } else {
            self.client
                .get(&format!("{}/paper/DOI:{}", self.base, record.doi))?
                .query(&[("fields", "openAccessPdf")])
        };

        let resp = request.send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => {
                debug!("Paper not indexed");
                return Ok(None);
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Semantic Scholar rate limit hit");
                return Ok(None);
            }
            _ => {}
        }
        let body = resp.error_for_status()?.json::<serde_json::Value>().await?;

        // Search responses wrap hits in `data`
        Ok(if record.doi.is_empty() {
            body["data"].as_array().and_then(|hits| hits.first().cloned())
        } else {
            Some(body)
        })
    }
}

#[async_trait]
impl PdfSource for SemanticScholarResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::SemanticScholar
    }

    #[instrument(skip(self, record), fields(doi = %record.doi))]
    async fn attempt(&self, record: &PaperRecord) -> anyhow::Result<Option<PdfCandidate>> {
        if record.doi.is_empty() && record.title.is_empty() {
            return Ok(None);
        }
        let Some(paper) = self.lookup(record).await? else {
            return Ok(None);
        };
        let url = paper["openAccessPdf"]["url"].as_str().unwrap_or("").trim();
        if url.is_empty() {
            return Ok(None);
        }
        Ok(rewrite_oa_url(url).map(PdfCandidate::Url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperDraft;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(title: &str, doi: &str) -> PaperRecord {
        PaperRecord::new(PaperDraft { title: title.into(), doi: doi.into(), ..Default::default() })
    }

    fn resolver(server: &MockServer) -> SemanticScholarResolver {
        SemanticScholarResolver::new(Client::new().unwrap()).with_base_url(&server.uri())
    }

    #[test]
    fn test_rewrite_rules() {
        assert_eq!(
            rewrite_oa_url("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC9876543/pdf/main.pdf").as_deref(),
            Some("https://europepmc.org/backend/ptpmcrender.fcgi?accid=PMC9876543&blobtype=pdf")
        );
        assert_eq!(rewrite_oa_url("https://www.biorxiv.org/content/10.1101/x.full.pdf"), None);
        assert_eq!(
            rewrite_oa_url("https://academic.oup.com/nar/article-pdf/1.pdf").as_deref(),
            Some("https://academic.oup.com/nar/article-pdf/1.pdf")
        );
    }

    #[tokio::test]
    async fn test_lookup_by_doi() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/DOI:10.1093/nar/gkae001"))
            .and(query_param("fields", "openAccessPdf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paperId": "abc",
                "openAccessPdf": { "url": "https://academic.oup.com/nar/gkae001.pdf", "status": "GOLD" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let got = resolver(&server).attempt(&record("t", "10.1093/nar/gkae001")).await.unwrap();
        assert!(matches!(got, Some(PdfCandidate::Url(u)) if u == "https://academic.oup.com/nar/gkae001.pdf"));
    }

    #[tokio::test]
    async fn test_title_search_without_doi() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/search"))
            .and(query_param("query", "Spatial transcriptomics of the gut"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "data": [{ "openAccessPdf": { "url": "https://europepmc.org/articles/PMC123/pdf" } }]
            })))
            .mount(&server)
            .await;

        let got = resolver(&server)
            .attempt(&record("Spatial transcriptomics of the gut", ""))
            .await
            .unwrap();
        assert!(matches!(got, Some(PdfCandidate::Url(u)) if u.contains("accid=PMC123")));
    }

    #[tokio::test]
    async fn test_rate_limit_and_missing_are_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/DOI:10.1/limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper/DOI:10.1/closed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "openAccessPdf": null })))
            .mount(&server)
            .await;

        let r = resolver(&server);
        assert!(r.attempt(&record("t", "10.1/limited")).await.unwrap().is_none());
        assert!(r.attempt(&record("t", "10.1/closed")).await.unwrap().is_none());
        assert!(r.attempt(&record("t", "10.1/unknown")).await.unwrap().is_none());
    }
}
