use async_trait::async_trait;
use genoscout_common::ResolverKind;

use crate::models::PaperRecord;
use super::{PdfCandidate, PdfSource};

/// The `pdf_url` the discovery adapter already supplied.
#[derive(Debug, Default)]
pub struct DirectUrl;

#[async_trait]
impl PdfSource for DirectUrl {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Direct
    }

    async fn attempt(&self, record: &PaperRecord) -> anyhow::Result<Option<PdfCandidate>> {
        if record.pdf_url.is_empty() {
            return Ok(None);
        }
        Ok(Some(PdfCandidate::Url(record.pdf_url.clone())))
    }
}
