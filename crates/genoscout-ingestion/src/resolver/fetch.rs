//! PDF download and acceptance check.

use genoscout_common::sandbox::SandboxClient as Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::debug;

/// Every PDF starts with this signature.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

pub fn looks_like_pdf(body: &[u8]) -> bool {
    body.starts_with(PDF_MAGIC)
}

/// Accept only a 200 whose content-type mentions pdf or whose body carries
/// the PDF signature. A 403 with a PDF body is still a rejection.
pub fn is_acceptable(status: StatusCode, content_type: Option<&str>, body: &[u8]) -> bool {
    if status != StatusCode::OK || body.is_empty() {
        return false;
    }
    let ct_pdf = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("pdf"))
        .unwrap_or(false);
    ct_pdf || looks_like_pdf(body)
}

/// Downloads candidate URLs through the browser-header path of the client.
#[derive(Debug, Clone)]
pub struct PdfFetcher {
    client: Client,
}

impl PdfFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// `Ok(None)` when the server answered but not with a PDF.
    pub async fn fetch(&self, url: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let resp = self.client.download(url)?.send().await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;

        if is_acceptable(status, content_type.as_deref(), &body) {
            Ok(Some(body.to_vec()))
        } else {
            debug!(
                %url,
                %status,
                content_type = content_type.as_deref().unwrap_or(""),
                bytes = body.len(),
                "Rejected non-PDF response"
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_acceptance_rules() {
        let pdf = b"%PDF-1.7 body";
        assert!(is_acceptable(StatusCode::OK, Some("application/pdf"), b"binary"));
        assert!(is_acceptable(StatusCode::OK, Some("application/octet-stream"), pdf));
        assert!(is_acceptable(StatusCode::OK, None, pdf));
        assert!(!is_acceptable(StatusCode::FORBIDDEN, Some("application/pdf"), pdf));
        assert!(!is_acceptable(StatusCode::OK, Some("text/html"), b"<html>captcha</html>"));
        assert!(!is_acceptable(StatusCode::OK, Some("application/pdf"), b""));
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper.pdf"))
            .and(wiremock::matchers::header_regex("user-agent", "Mozilla/5.0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 x".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PdfFetcher::new(Client::new().unwrap());
        let body = fetcher.fetch(&format!("{}/paper.pdf", server.uri())).await.unwrap();
        assert_eq!(body.as_deref(), Some(b"%PDF-1.4 x".as_slice()));
    }

    #[tokio::test]
    async fn test_fetch_rejects_forbidden_pdf_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.4 blocked".to_vec()),
            )
            .mount(&server)
            .await;

        let fetcher = PdfFetcher::new(Client::new().unwrap());
        assert!(fetcher.fetch(&format!("{}/x.pdf", server.uri())).await.unwrap().is_none());
    }
}
