use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::GenoscoutError;

/// User agent sent with discovery and resolver API calls.
pub const API_USER_AGENT: &str = concat!(
    "Genoscout/",
    env!("CARGO_PKG_VERSION"),
    " (genomics paper collector)"
);

/// Browser-like user agent for artifact downloads. Several publishers and
/// repositories refuse non-browser agents outright.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// A capped HTTP client.
///
/// API lookups (`get`) are only allowed against approved hosts. Artifact
/// downloads (`download`) may target any http(s) URL, since open-access PDFs
/// live on arbitrary publisher and repository hosts, but always go out with
/// browser headers and the configured timeout.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and a 30 s timeout.
    pub fn new() -> Result<Self, GenoscoutError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with the default allowlist and the given per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, GenoscoutError> {
        let mut allowlist = HashSet::new();
        let domains = [
            "api.biorxiv.org",         // bioRxiv / medRxiv details API
            "api.semanticscholar.org", // Semantic Scholar graph API
            "www.ebi.ac.uk",           // Europe PMC REST API
            "europepmc.org",           // Europe PMC render service
            "api.core.ac.uk",          // CORE v3
            "api.unpaywall.org",       // Unpaywall
            "doi.org",                 // DOI landing pages
            "localhost",
            "127.0.0.1",
        ];
        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(API_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| GenoscoutError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_lowercase());
    }

    /// Appends the host of `url` to the allowlist (used for configured feeds).
    pub fn allow_url_host(&mut self, url: &str) -> Result<(), GenoscoutError> {
        let parsed = Url::parse(url)
            .map_err(|e| GenoscoutError::Config(format!("invalid URL {url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| GenoscoutError::Config(format!("URL has no host: {url}")))?;
        self.allow_domain(host);
        Ok(())
    }

    /// Validates if a URL is permitted for API calls under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// GET request against an allowlisted API host.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, GenoscoutError> {
        if !self.is_allowed(url) {
            return Err(GenoscoutError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }

    /// GET request for a document (PDF or landing page) with browser headers.
    pub fn download(&self, url: &str) -> Result<reqwest::RequestBuilder, GenoscoutError> {
        let parsed = Url::parse(url)
            .map_err(|e| GenoscoutError::Security(format!("invalid download URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GenoscoutError::Security(format!(
                "refusing non-http download URL {}",
                url
            )));
        }

        Ok(self.client.get(parsed).headers(browser_headers()))
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/pdf,text/html,*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}
