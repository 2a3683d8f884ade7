//! Data models for the acquisition pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::naming::compute_uid;

/// How the downstream reviewer should read a paper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    Pdf,
    #[default]
    Abstract,
}

/// Adapter-side view of a paper before it gets an identity.
///
/// Adapters fill this in and call [`PaperRecord::new`]; they never touch a
/// record's fields afterwards.
#[derive(Debug, Clone, Default)]
pub struct PaperDraft {
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub source: String,
    pub url: String,
    pub doi: String,
    pub date: String,
    pub pdf_url: String,
}

/// One discovered paper, as written into the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    uid: String,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub pdf_url: String,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pdf_path: String,
    #[serde(default)]
    review_mode: ReviewMode,
}

impl PaperRecord {
    /// Normalises the draft and assigns the uid (DOI if present, else title).
    pub fn new(draft: PaperDraft) -> Self {
        let title = collapse_whitespace(&draft.title);
        let doi = draft.doi.trim().to_string();
        let uid = compute_uid(if doi.is_empty() { &title } else { &doi });

        Self {
            uid,
            title,
            authors: collapse_whitespace(&draft.authors),
            abstract_text: draft.abstract_text.trim().to_string(),
            source: draft.source.trim().to_string(),
            url: draft.url.trim().to_string(),
            doi,
            date: draft.date.trim().to_string(),
            pdf_url: draft.pdf_url.trim().to_string(),
            matched_keywords: Vec::new(),
            pdf_path: String::new(),
            review_mode: ReviewMode::Abstract,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Canonical dedup key: DOI when present, else the normalised title.
    pub fn dedup_key(&self) -> &str {
        if self.doi.is_empty() { &self.title } else { &self.doi }
    }

    pub fn pdf_path(&self) -> &str {
        &self.pdf_path
    }

    pub fn review_mode(&self) -> ReviewMode {
        self.review_mode
    }

    pub fn has_pdf(&self) -> bool {
        !self.pdf_path.is_empty()
    }

    /// Records a successful acquisition; the review mode follows the path.
    pub fn mark_acquired(&mut self, path: &Path) {
        self.pdf_path = path.to_string_lossy().into_owned();
        self.review_mode = if self.pdf_path.is_empty() { ReviewMode::Abstract } else { ReviewMode::Pdf };
    }

    /// Records exhaustion (or a run without downloads).
    pub fn mark_abstract_only(&mut self) {
        self.pdf_path.clear();
        self.review_mode = ReviewMode::Abstract;
    }
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, doi: &str) -> PaperDraft {
        PaperDraft {
            title: title.to_string(),
            doi: doi.to_string(),
            source: "bioRxiv (genomics)".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_uid_prefers_doi() {
        let a = PaperRecord::new(draft("Title one", "10.1/x"));
        let b = PaperRecord::new(draft("Completely different", "10.1/x"));
        assert_eq!(a.uid(), b.uid());
    }

    #[test]
    fn test_uid_falls_back_to_normalised_title() {
        let a = PaperRecord::new(draft("Single-cell  atlas\n of the gut", ""));
        let b = PaperRecord::new(draft("Single-cell atlas of the gut", ""));
        assert_eq!(a.uid(), b.uid());
        assert_eq!(a.title, "Single-cell atlas of the gut");
        assert_eq!(a.dedup_key(), "Single-cell atlas of the gut");
    }

    #[test]
    fn test_review_mode_follows_pdf_path() {
        let mut rec = PaperRecord::new(draft("A", "10.1/a"));
        assert_eq!(rec.review_mode(), ReviewMode::Abstract);
        rec.mark_acquired(Path::new("pdfs/a.pdf"));
        assert_eq!(rec.review_mode(), ReviewMode::Pdf);
        assert!(rec.has_pdf());
        rec.mark_abstract_only();
        assert_eq!(rec.review_mode(), ReviewMode::Abstract);
        assert_eq!(rec.pdf_path(), "");
    }

    #[test]
    fn test_serialised_field_names() {
        let rec = PaperRecord::new(PaperDraft {
            abstract_text: "We sequence things.".to_string(),
            ..draft("A", "10.1/a")
        });
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["abstract"], "We sequence things.");
        assert_eq!(v["review_mode"], "abstract");
        assert_eq!(v["pdf_path"], "");
        assert!(v["uid"].as_str().is_some());
        assert!(v["matched_keywords"].as_array().unwrap().is_empty());
    }
}
