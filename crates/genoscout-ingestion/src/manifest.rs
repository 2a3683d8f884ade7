//! Run manifest: the single artifact a downstream reviewer reads.

use chrono::NaiveDate;
use genoscout_common::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::PaperRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Run date, `YYYY-MM-DD`
    pub date: String,
    pub days_lookback: u32,
    pub pdf_dir: String,
    /// Records left after deduplication and the exclusion pass
    pub total_fetched: usize,
    /// Records kept by the relevance filter, after the cap
    pub total_genomics: usize,
    pub total_pdfs: usize,
    pub papers: Vec<PaperRecord>,
}

impl Manifest {
    /// Counts are derived from `papers`, never passed in, so they cannot drift.
    pub fn assemble(
        date: NaiveDate,
        days_lookback: u32,
        pdf_dir: &Path,
        total_fetched: usize,
        papers: Vec<PaperRecord>,
    ) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            days_lookback,
            pdf_dir: pdf_dir.to_string_lossy().into_owned(),
            total_fetched,
            total_genomics: papers.len(),
            total_pdfs: papers.iter().filter(|p| p.has_pdf()).count(),
            papers,
        }
    }

    /// Writes pretty-printed JSON, replacing any previous manifest in one step.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|e| e.error)?;

        info!(path = %path.display(), papers = self.papers.len(), "Manifest written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
